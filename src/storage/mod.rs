pub(crate) mod ring_mmap;
