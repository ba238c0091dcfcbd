//! Test doubles for driving the watcher without a GPU.

use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::query::SmiRunner;

/// Which of the three command shapes an invocation was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    List,
    Processes,
    Gpus,
}

impl Query {
    fn of(args: &[String]) -> Self {
        match args.first().map(String::as_str) {
            Some(a) if a.starts_with("--query-compute-apps") => Query::Processes,
            Some(a) if a.starts_with("--query-gpu") => Query::Gpus,
            _ => Query::List,
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Fail(String),
}

#[derive(Default)]
struct Script {
    replies: HashMap<Query, VecDeque<Reply>>,
    delays: HashMap<Query, Duration>,
    calls: Vec<Query>,
}

/// Replays queued replies per query kind. The last queued reply repeats.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, query: Query, text: &str) -> Self {
        self.push(query, Reply::Output(text.to_string()))
    }

    pub fn fail(self, query: Query, output: &str) -> Self {
        self.push(query, Reply::Fail(output.to_string()))
    }

    /// Every invocation of `query` takes `delay` (tokio time).
    pub fn delay(self, query: Query, delay: Duration) -> Self {
        self.script.lock().unwrap().delays.insert(query, delay);
        self
    }

    pub fn calls(&self, query: Query) -> usize {
        let script = self.script.lock().unwrap();
        script.calls.iter().filter(|q| **q == query).count()
    }

    fn push(self, query: Query, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .entry(query)
            .or_default()
            .push_back(reply);
        self
    }
}

impl SmiRunner for ScriptedRunner {
    async fn run(&self, args: &[String]) -> Result<String> {
        let query = Query::of(args);
        let (reply, delay) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(query);
            let queue = script.replies.entry(query).or_default();
            let reply = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            let delay = script.delays.get(&query).copied().unwrap_or_default();
            (reply, delay)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Reply::Output(text)) => Ok(text),
            Some(Reply::Fail(output)) => Err(WatchError::ExternalTool {
                command: format!("nvidia-smi {}", args.join(" ")),
                status: "exit status: 9".to_string(),
                output,
            }),
            None => Ok(String::new()),
        }
    }
}

/// CSV as printed by `--query-compute-apps=pid,process_name,gpu_uuid`.
pub fn process_table(rows: &[(u32, &str)]) -> String {
    let mut out = String::from("pid, process_name, gpu_uuid\n");
    for (pid, name) in rows {
        out.push_str(&format!("{pid}, {name}, GPU-0000\n"));
    }
    out
}

/// CSV as printed by `--query-gpu=index,gpu_uuid,utilization.gpu,power.draw,power.max_limit`.
pub fn gpu_table(rows: &[(&str, f64, f64)]) -> String {
    let mut out = String::from(
        "index, uuid, utilization.gpu [%], power.draw [W], power.max_limit [W]\n",
    );
    for (index, draw, limit) in rows {
        out.push_str(&format!(
            "{index}, GPU-{index:0>4}, 37 %, {draw:.2} W, {limit:.2} W\n"
        ));
    }
    out
}
