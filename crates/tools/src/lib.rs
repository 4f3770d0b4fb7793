//! ツール共通部品

pub mod common;
