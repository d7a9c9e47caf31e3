//! Password hashing for configured accounts.

pub mod hasher;
