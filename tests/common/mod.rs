//! Shared test doubles
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use zjs_ashell::services::{Board, JsEngine, Terminal};
use zjs_ashell::{SerialPort, UartLink};

/// Terminal that records everything sent to it.
#[derive(Default)]
pub struct Recorder {
    pub out: Vec<u8>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn contains(&self, s: &str) -> bool {
        self.text().contains(s)
    }

    pub fn clear(&mut self) {
        self.out.clear();
    }
}

impl Terminal for Recorder {
    fn send(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }
}

/// JavaScript engine that only remembers what it was asked.
#[derive(Default)]
pub struct JsSpy {
    pub runs: Vec<String>,
    pub evals: Vec<Vec<u8>>,
    pub parses: Vec<String>,
    pub stops: usize,
}

impl JsEngine for JsSpy {
    fn run(&mut self, file: &str, _term: &mut dyn Terminal) {
        self.runs.push(file.to_string());
    }

    fn eval(&mut self, source: &[u8], _term: &mut dyn Terminal) {
        self.evals.push(source.to_vec());
    }

    fn parse(&mut self, file: &str, _term: &mut dyn Terminal) {
        self.parses.push(file.to_string());
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

#[derive(Default)]
pub struct BoardSpy {
    pub reboots: usize,
}

impl Board for BoardSpy {
    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

/// Serial port backed by byte queues.
///
/// TX completes instantly: `tx_wait` raises the link's TX-ready flag.
pub struct LoopPort<'l, const SLOTS: usize, const CAP: usize> {
    pub link: &'l UartLink<SLOTS, CAP>,
    pub rx: RefCell<VecDeque<u8>>,
    pub tx: RefCell<Vec<u8>>,
}

impl<'l, const SLOTS: usize, const CAP: usize> LoopPort<'l, SLOTS, CAP> {
    pub fn new(link: &'l UartLink<SLOTS, CAP>) -> Self {
        Self {
            link,
            rx: RefCell::new(VecDeque::new()),
            tx: RefCell::new(Vec::new()),
        }
    }

    /// Queue bytes and raise the RX interrupt.
    pub fn receive(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
        self.link.on_interrupt(self);
    }

    pub fn sent(&self) -> String {
        String::from_utf8_lossy(&self.tx.borrow()).into_owned()
    }

    pub fn clear_sent(&self) {
        self.tx.borrow_mut().clear();
    }
}

impl<const SLOTS: usize, const CAP: usize> SerialPort for LoopPort<'_, SLOTS, CAP> {
    fn irq_is_pending(&self) -> bool {
        !self.rx.borrow().is_empty()
    }

    fn irq_rx_ready(&self) -> bool {
        !self.rx.borrow().is_empty()
    }

    fn irq_tx_ready(&self) -> bool {
        false
    }

    fn fifo_read(&self, buf: &mut [u8]) -> usize {
        let mut rx = self.rx.borrow_mut();
        let n = buf.len().min(rx.len());
        for (dst, src) in buf.iter_mut().zip(rx.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn fifo_fill(&self, data: &[u8]) -> usize {
        let n = data.len().min(16);
        self.tx.borrow_mut().extend_from_slice(&data[..n]);
        n
    }

    fn irq_tx_enable(&self) {}

    fn irq_tx_disable(&self) {}

    fn tx_wait(&self) {
        self.link.on_tx_ready();
    }
}
