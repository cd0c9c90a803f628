pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod entrez;
pub mod error;
pub mod export;
pub mod gbseq;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod upload;
