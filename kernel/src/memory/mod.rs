//! User memory access.
//!
//! The trampoline reads and writes frames in memory the interrupted thread
//! owns. [`uaccess`] defines the fault-reporting access primitives it needs
//! and [`vma`] provides a software address space implementing them.

pub mod uaccess;
pub mod vma;

pub use uaccess::UserMemory;
pub use vma::{Protection, Vma, VmaSpace};
