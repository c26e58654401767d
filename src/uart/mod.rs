pub mod protocol;
pub use protocol::*;

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};

use crate::error::{Result, RigError};
use crate::lock;
use crate::rig::Pose;

pub const MAX_LINE_LEN: usize = 256;
const READ_SLICE: Duration = Duration::from_millis(10);

/// Byte-oriented duplex link to the rig firmware
pub trait SerialLink: Send{
    /// Write the whole buffer or fail with `RigError::Transport`.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for one complete line. `Ok(None)` on timeout.
    fn receive_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Drop anything already received but not yet read.
    fn discard_input(&mut self) -> Result<()>{
        Ok(())
    }

    /// Second handle on the same link, so one side can wait for a reply
    /// while the other keeps writing.
    fn try_clone(&self) -> Result<Box<dyn SerialLink>>;
}

//pull the first non-empty CR or LF terminated line out of the buffer
pub fn take_line(rx_buffer: &mut Vec<u8>) -> Option<String>{
    while let Some(end) = rx_buffer.iter().position(|&b| b == b'\r' || b == b'\n'){
        let raw: Vec<u8> = rx_buffer.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw[..end]).trim().to_string();
        if !line.is_empty(){
            return Some(line);
        }
    }

    //no terminator in sight, don't let noise grow the buffer forever
    if rx_buffer.len() > MAX_LINE_LEN{
        rx_buffer.clear();
    }
    None
}

pub struct SerialPortLink{
    port: Box<dyn SerialPort>,
    rx_buffer: Vec<u8>,
    write_timeout: Duration,
}

impl SerialPortLink{
    pub fn open(port_name: &str, baud_rate: u32, write_timeout: Duration) -> Result<Self>{
        let port = serialport::new(port_name, baud_rate)
            .timeout(write_timeout)
            .open()?;

        info!("Opened {} at {} baud", port_name, baud_rate);

        Ok(SerialPortLink{
            port,
            rx_buffer: Vec::with_capacity(MAX_LINE_LEN),
            write_timeout,
        })
    }

    fn read_until(&mut self, deadline: Instant) -> Result<Option<String>>{
        let mut read_buf = [0u8; 64];

        loop{
            if let Some(line) = take_line(&mut self.rx_buffer){
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline{
                return Ok(None);
            }
            self.port.set_timeout((deadline - now).min(READ_SLICE))?;

            match self.port.read(&mut read_buf){
                Ok(n) if n > 0 => self.rx_buffer.extend_from_slice(&read_buf[..n]),
                Ok(_) => {}
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(RigError::Io(e)),
            }
        }
    }
}

impl SerialLink for SerialPortLink{
    fn send(&mut self, bytes: &[u8]) -> Result<()>{
        self.port
            .write_all(bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| RigError::Transport(e.to_string()))
    }

    fn receive_line(&mut self, timeout: Duration) -> Result<Option<String>>{
        let result = self.read_until(Instant::now() + timeout);
        //reads shorten the port timeout, writes need it back
        self.port.set_timeout(self.write_timeout)?;
        result
    }

    fn discard_input(&mut self) -> Result<()>{
        self.rx_buffer.clear();
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn try_clone(&self) -> Result<Box<dyn SerialLink>>{
        Ok(Box::new(SerialPortLink{
            port: self.port.try_clone()?,
            rx_buffer: Vec::with_capacity(MAX_LINE_LEN),
            write_timeout: self.write_timeout,
        }))
    }
}

#[derive(Default)]
struct MemoryLinkState{
    written: Vec<u8>,
    rx_buffer: Vec<u8>,
    reset_replies: VecDeque<String>,
    //answer for every RESET once the queued replies run out
    reset_answer: Option<String>,
    fail_writes: bool,
}

/// In-process link. Clones share the same state, so one handle can be
/// given to the rig while another inspects the traffic.
#[derive(Clone, Default)]
pub struct MemoryLink{
    state: Arc<Mutex<MemoryLinkState>>,
}

impl MemoryLink{
    pub fn new() -> Self{
        Self::default()
    }

    /// Queue raw bytes as if the firmware had sent them.
    pub fn push_response(&self, raw: &str){
        lock(&self.state).rx_buffer.extend_from_slice(raw.as_bytes());
    }

    /// Answer the next `RESET` request with `raw`.
    pub fn reply_to_reset(&self, raw: &str){
        lock(&self.state).reset_replies.push_back(raw.to_string());
    }

    /// Answer every `RESET` with `INIT:<h>,<v>` for `pose`. Replies queued
    /// with `reply_to_reset` go first.
    pub fn answer_resets_with(&self, pose: Pose){
        lock(&self.state).reset_answer = Some(format!("{}{},{}\r\n", INIT_PREFIX, pose.horizontal, pose.vertical));
    }

    pub fn set_fail_writes(&self, fail: bool){
        lock(&self.state).fail_writes = fail;
    }

    pub fn written(&self) -> Vec<u8>{
        lock(&self.state).written.clone()
    }

    /// Written traffic split into commands, terminators removed.
    pub fn lines(&self) -> Vec<String>{
        let written = self.written();
        String::from_utf8_lossy(&written)
            .split(TERMINATOR as char)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn clear_written(&self){
        lock(&self.state).written.clear();
    }
}

impl SerialLink for MemoryLink{
    fn send(&mut self, bytes: &[u8]) -> Result<()>{
        let mut state = lock(&self.state);
        if state.fail_writes{
            return Err(RigError::Transport("write timed out".to_string()));
        }
        state.written.extend_from_slice(bytes);

        if bytes == WireCommand::Reset.encode().as_slice(){
            let reply = state.reset_replies.pop_front().or_else(|| state.reset_answer.clone());
            if let Some(reply) = reply{
                debug!("memory link answering reset with {:?}", reply);
                state.rx_buffer.extend_from_slice(reply.as_bytes());
            }
        }
        Ok(())
    }

    //never blocks: either a line is buffered or this counts as a timeout
    fn receive_line(&mut self, _timeout: Duration) -> Result<Option<String>>{
        Ok(take_line(&mut lock(&self.state).rx_buffer))
    }

    fn try_clone(&self) -> Result<Box<dyn SerialLink>>{
        Ok(Box::new(self.clone()))
    }
}
