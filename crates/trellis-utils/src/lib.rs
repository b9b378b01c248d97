mod sorted;

pub use sorted::SortedBuffer;
