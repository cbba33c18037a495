pub mod commands;
pub mod parsers;
pub mod tx_utils;
