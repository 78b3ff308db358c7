use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::RuntimeError;

/// Everything the evaluator needs from the world outside the program.
#[async_trait(?Send)]
pub trait HostServices {
  fn print(&self, line: &str);

  /// Shows `prompt` and waits for one line of input, without the trailing newline.
  async fn input(&self, prompt: &str) -> Result<String, RuntimeError>;

  async fn sleep(&self, millis: f64);

  /// Uniform integer in `min..=max`.
  fn random_int(&self, min: i64, max: i64) -> i64;

  fn debug(&self, message: &str) {
    debug!(target: "forge::host", "{message}");
  }
}

/// Host backed by the process' stdin and stdout.
pub struct StdHost {
  stdin: Mutex<BufReader<Stdin>>,
}

impl StdHost {
  pub fn new() -> Self {
    StdHost {
      stdin: Mutex::new(BufReader::new(io::stdin())),
    }
  }
}

impl Default for StdHost {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait(?Send)]
impl HostServices for StdHost {
  fn print(&self, line: &str) {
    println!("{line}");
  }

  async fn input(&self, prompt: &str) -> Result<String, RuntimeError> {
    let mut stdout = io::stdout();

    stdout
      .write_all(prompt.as_bytes())
      .await
      .map_err(|error| RuntimeError::io(error.to_string()))?;

    stdout
      .flush()
      .await
      .map_err(|error| RuntimeError::io(error.to_string()))?;

    let mut line = String::new();

    let read = self
      .stdin
      .lock()
      .await
      .read_line(&mut line)
      .await
      .map_err(|error| RuntimeError::io(error.to_string()))?;

    if read == 0 {
      return Err(RuntimeError::io("end of input"));
    }

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
  }

  async fn sleep(&self, millis: f64) {
    tokio::time::sleep(Duration::from_millis(millis.max(0.0) as u64)).await;
  }

  fn random_int(&self, min: i64, max: i64) -> i64 {
    if min >= max {
      return min;
    }

    rand::thread_rng().gen_range(min..=max)
  }
}

/// Host that records output and replays queued input. Sleeping returns immediately.
pub struct RecordingHost {
  output: RefCell<Vec<String>>,
  inputs: RefCell<VecDeque<String>>,
  prompts: RefCell<Vec<String>>,
  sleeps: RefCell<Vec<f64>>,
  rng: RefCell<StdRng>,
}

impl RecordingHost {
  pub fn new() -> Self {
    RecordingHost {
      output: RefCell::new(vec![]),
      inputs: RefCell::new(VecDeque::new()),
      prompts: RefCell::new(vec![]),
      sleeps: RefCell::new(vec![]),
      rng: RefCell::new(StdRng::seed_from_u64(7)),
    }
  }

  pub fn with_inputs(inputs: &[&str]) -> Self {
    let host = Self::new();

    host
      .inputs
      .borrow_mut()
      .extend(inputs.iter().map(|input| input.to_string()));

    host
  }

  pub fn output(&self) -> Vec<String> {
    self.output.borrow().clone()
  }

  pub fn prompts(&self) -> Vec<String> {
    self.prompts.borrow().clone()
  }

  pub fn sleeps(&self) -> Vec<f64> {
    self.sleeps.borrow().clone()
  }
}

impl Default for RecordingHost {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait(?Send)]
impl HostServices for RecordingHost {
  fn print(&self, line: &str) {
    self.output.borrow_mut().push(line.to_string());
  }

  async fn input(&self, prompt: &str) -> Result<String, RuntimeError> {
    self.prompts.borrow_mut().push(prompt.to_string());

    self
      .inputs
      .borrow_mut()
      .pop_front()
      .ok_or_else(|| RuntimeError::io("no more input"))
  }

  async fn sleep(&self, millis: f64) {
    self.sleeps.borrow_mut().push(millis);
  }

  fn random_int(&self, min: i64, max: i64) -> i64 {
    if min >= max {
      return min;
    }

    self.rng.borrow_mut().gen_range(min..=max)
  }
}
