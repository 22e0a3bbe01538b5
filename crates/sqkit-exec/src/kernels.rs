//! Map and histogram kernels shared by both substrates.
//!
//! Substrates differ only in *where* these run (caller thread, global Rayon
//! pool, or the device pool) and in chunk granularity.

use rayon::prelude::*;

pub(crate) fn map_sequential<I, O, F>(input: &[I], out: &mut [O], f: &F)
where
    F: Fn(&I) -> O,
{
    debug_assert_eq!(input.len(), out.len());
    for (dst, src) in out.iter_mut().zip(input) {
        *dst = f(src);
    }
}

pub(crate) fn map_parallel<I, O, F>(input: &[I], out: &mut [O], chunk_size: usize, f: &F)
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> O + Sync,
{
    debug_assert_eq!(input.len(), out.len());
    input
        .par_chunks(chunk_size)
        .zip(out.par_chunks_mut(chunk_size))
        .for_each(|(src, dst)| map_sequential(src, dst, f));
}

pub(crate) fn histogram_sequential<I, F>(input: &[I], mut counts: Vec<u64>, bin_of: &F) -> Vec<u64>
where
    F: Fn(&I) -> Option<usize>,
{
    for item in input {
        if let Some(bin) = bin_of(item)
            && let Some(slot) = counts.get_mut(bin)
        {
            *slot += 1;
        }
    }
    counts
}

pub(crate) fn histogram_parallel<I, F, A>(
    input: &[I],
    chunk_size: usize,
    alloc: &A,
    bin_of: &F,
) -> Vec<u64>
where
    I: Sync,
    F: Fn(&I) -> Option<usize> + Sync,
    A: Fn() -> Vec<u64> + Sync,
{
    input
        .par_chunks(chunk_size)
        .map(|chunk| histogram_sequential(chunk, alloc(), bin_of))
        .reduce(alloc, |mut acc, partial| {
            for (total, count) in acc.iter_mut().zip(partial) {
                *total += count;
            }
            acc
        })
}
