pub mod chunking_strategy;
pub mod index_builder;
pub mod index_handle;
pub mod retriever;
pub mod vector_index;
