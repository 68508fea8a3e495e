use crate::traits::{MemoryStore, Turn};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-process conversation buffer. Lost when the process exits.
#[derive(Default)]
pub struct BufferMemory {
    turns: Mutex<Vec<Turn>>,
}

impl BufferMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<Turn>>> {
        self.turns
            .lock()
            .map_err(|_| anyhow::anyhow!("conversation buffer lock poisoned"))
    }
}

#[async_trait]
impl MemoryStore for BufferMemory {
    fn name(&self) -> &str {
        "buffer"
    }

    async fn append(&self, turns: Vec<Turn>) -> anyhow::Result<()> {
        self.lock()?.extend(turns);
        Ok(())
    }

    async fn turns(&self) -> anyhow::Result<Vec<Turn>> {
        Ok(self.lock()?.clone())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn len(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.len())
    }
}
