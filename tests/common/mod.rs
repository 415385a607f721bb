use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use kafkabridge::consumer::{
    Consumer, ConsumerOptions, HandlerError, Message, MessageHandler, MessageReader, ReadError,
};

/// Reader that replays a script, then blocks until cancelled.
pub struct ScriptedReader {
    script: VecDeque<Result<Message, ReadError>>,
    closes: Arc<Mutex<usize>>,
}

#[async_trait]
impl MessageReader for ScriptedReader {
    async fn read_message(&mut self, cancel: &CancellationToken) -> Result<Message, ReadError> {
        if let Some(next) = self.script.pop_front() {
            return next;
        }
        cancel.cancelled().await;
        Err(ReadError::Cancelled)
    }

    async fn close(&mut self) -> Result<(), ReadError> {
        *self.closes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Builds `n` messages on `topic` with offsets starting at 1.
#[allow(dead_code)]
pub fn messages(topic: &str, n: i64) -> Vec<Result<Message, ReadError>> {
    (1..=n)
        .map(|offset| Ok(Message::new(topic, 0, offset, format!("message {}", offset))))
        .collect()
}

/// Consumer whose every `poll` replays `script`; returns the close counter.
#[allow(dead_code)]
pub fn scripted_consumer(script: Vec<Result<Message, ReadError>>) -> (Consumer, Arc<Mutex<usize>>) {
    let closes = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&closes);
    let consumer = Consumer::new(ConsumerOptions::default()).with_reader_factory(move |_| {
        Ok(Box::new(ScriptedReader {
            script: script.clone().into(),
            closes: Arc::clone(&counter),
        }) as Box<dyn MessageReader>)
    });
    (consumer, closes)
}

/// Handler that records every message it sees.
#[derive(Default)]
pub struct RecordingHandler {
    pub seen: Mutex<Vec<Message>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn offsets(&self) -> Vec<i64> {
        self.seen.lock().unwrap().iter().map(|m| m.offset).collect()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, message: Message) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(message);
        Ok(())
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("kafkabridge.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
