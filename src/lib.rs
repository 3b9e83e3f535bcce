#![doc = include_str!("../README.md")]
#![warn(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(rustdoc::private_intra_doc_links)]

extern crate alloc;

mod builder;
mod error;
mod eviction;
mod font_image;
mod insert;
mod lookup;
mod registry;
mod text;
mod utils;

pub use error::Error;
pub use font_image::CACHE_COUNT;
pub use registry::{
    CacheEntry, Environment, FontHandle, OverflowMode, TextAttributes, ThreadRegistries,
    ThreadRole,
};
