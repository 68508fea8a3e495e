use crate::memory::BufferMemory;
use crate::traits::MemoryStore;
use std::sync::Arc;

/// Creates the memory store for a new conversation.
pub fn create_memory() -> Arc<dyn MemoryStore> {
    Arc::new(BufferMemory::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_buffer() {
        let mem = create_memory();
        assert_eq!(mem.name(), "buffer");
    }
}
