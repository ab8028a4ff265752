//! In-memory adapters.

mod in_memory_interview_store;

pub use in_memory_interview_store::InMemoryInterviewStore;
