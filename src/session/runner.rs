//! Session runner.
//!
//! Task-side loop body: takes flushed buffers off the link, feeds the active
//! handler and swaps handlers when one reports done. Bytes a finishing
//! handler did not consume stay queued for its successor.

use crate::config::{BANNER, CONFIG, MAX_LINE, POOL_SLOTS};
use crate::diag::UartPhase;
use crate::ihex::IhexUpload;
use crate::log_globals::TASK_LOG_STREAM;
use crate::pool::LineBuffer;
use crate::services::Services;
use crate::shell::{print_help, Shell};
use crate::uart::{TransportError, UartLink};
use crate::{rt_debug, rt_error, rt_info, rt_warn};

use super::{HandlerKind, SessionHandler};

/// Owns the handlers and decides which one sees the next bytes.
pub struct SessionRunner<'l, const SLOTS: usize = POOL_SLOTS, const CAP: usize = MAX_LINE> {
    link: &'l UartLink<SLOTS, CAP>,
    shell: Shell,
    upload: IhexUpload,
    active: HandlerKind,
    /// Unconsumed tail of the last buffer, offered before the queue.
    pending: Option<LineBuffer<'l, CAP>>,
    /// Receive counter when activity was last seen.
    last_rx: u32,
    last_activity_ms: u32,
    /// Drop counter already reported to a handler.
    last_dropped: u32,
}

impl<'l, const SLOTS: usize, const CAP: usize> SessionRunner<'l, SLOTS, CAP> {
    pub fn new(link: &'l UartLink<SLOTS, CAP>) -> Self {
        Self {
            link,
            shell: Shell::new(),
            upload: IhexUpload::new(),
            active: HandlerKind::Shell,
            pending: None,
            last_rx: 0,
            last_activity_ms: 0,
            last_dropped: 0,
        }
    }

    pub fn active(&self) -> HandlerKind {
        self.active
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn upload(&self) -> &IhexUpload {
        &self.upload
    }

    /// Bytes held back for the next handler.
    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, |b| b.len())
    }

    fn handler(&mut self) -> &mut dyn SessionHandler {
        match self.active {
            HandlerKind::Shell => &mut self.shell,
            HandlerKind::Upload => &mut self.upload,
        }
    }

    /// Greet the host and start the shell.
    pub fn start(&mut self, now_ms: u32, svc: &mut Services<'_>) {
        self.last_activity_ms = now_ms;
        self.last_rx = self.link.stats().rx_bytes();
        self.last_dropped = self.link.stats().dropped_bytes();

        svc.term.print(BANNER);
        print_help(&mut *svc.term);

        self.active = HandlerKind::Shell;
        self.init_active(svc);
    }

    /// Initialize the active handler, falling back to whatever its `close`
    /// names if start-up fails.
    fn init_active(&mut self, svc: &mut Services<'_>) {
        self.link.stats().set_phase(UartPhase::Init);

        // The shell never fails to start, so two attempts always settle
        for _ in 0..2 {
            let kind = self.active;
            match self.handler().init(svc) {
                Ok(()) => return,
                Err(e) => {
                    rt_error!(TASK_LOG_STREAM, "{:?} init failed: {}", kind, e);
                    self.active = self.handler().close(svc);
                }
            }
        }
    }

    /// Close the active handler and start its successor.
    fn switch(&mut self, svc: &mut Services<'_>) {
        self.link.stats().set_phase(UartPhase::Close);

        let from = self.active;
        self.active = self.handler().close(svc);
        rt_info!(TASK_LOG_STREAM, "session {:?} -> {:?}", from, self.active);

        self.init_active(svc);
    }

    /// Next buffer to process: held-back bytes first, then the queue, then
    /// (after the idle timeout) whatever the interrupt is still filling.
    fn next_buffer(&mut self, now_ms: u32) -> Option<LineBuffer<'l, CAP>> {
        if let Some(buf) = self.pending.take() {
            return Some(buf);
        }

        let link = self.link;
        if let Some(buf) = link.take_ready() {
            return Some(buf);
        }

        let rx = link.stats().rx_bytes();
        if rx != self.last_rx {
            self.last_rx = rx;
            self.last_activity_ms = now_ms;
        }
        if now_ms.wrapping_sub(self.last_activity_ms) < CONFIG.idle_timeout_ms() {
            link.stats().set_phase(UartPhase::Waiting);
            return None;
        }

        link.stats().set_phase(UartPhase::Timeout);
        if let Some(buf) = link.take_partial() {
            return Some(buf);
        }

        if link.pending() == 0 && !link.has_partial() {
            let freed = link.drain_idle();
            if freed > 0 {
                rt_debug!(TASK_LOG_STREAM, "idle: freed {} buffers", freed);
            }
        }
        self.last_activity_ms = now_ms;
        None
    }

    /// Report transport trouble seen since the last check.
    fn check_transport(&mut self, svc: &mut Services<'_>) {
        if let Some(err) = svc.term.take_error() {
            self.handler().error(err, svc);
        }

        let dropped = self.link.stats().dropped_bytes();
        if dropped != self.last_dropped {
            let lost = dropped.wrapping_sub(self.last_dropped);
            self.last_dropped = dropped;
            self.handler().error(TransportError::RxDropped(lost), svc);
        }
    }

    /// One runner iteration. Returns `true` if a buffer was processed.
    pub fn poll(&mut self, now_ms: u32, svc: &mut Services<'_>) -> bool {
        let Some(mut buf) = self.next_buffer(now_ms) else {
            return false;
        };
        self.last_activity_ms = now_ms;

        svc.status = Some(self.link.status());
        let len = buf.len();
        let used = self.handler().process(buf.as_slice(), svc).min(len);
        self.link.stats().add_processed(used);

        self.check_transport(svc);

        let done = self.handler().is_done();
        if used < len && (done || used > 0) {
            buf.consume(used);
            self.pending = Some(buf);
        } else {
            if used < len {
                rt_warn!(TASK_LOG_STREAM, "{:?} stalled, {} bytes dropped", self.active, len);
                self.link.stats().add_dropped(len);
                self.last_dropped = self.link.stats().dropped_bytes();
            }
            self.link.release(buf);
        }

        if done {
            self.switch(svc);
        } else {
            self.link.signal_consumer_ready();
        }
        true
    }

    /// Close the active handler for good.
    pub fn stop(&mut self, svc: &mut Services<'_>) {
        if let Some(buf) = self.pending.take() {
            self.link.release(buf);
        }
        self.link.stats().set_phase(UartPhase::Close);
        let _ = self.handler().close(svc);
        self.link.stats().set_phase(UartPhase::Terminated);
        rt_info!(TASK_LOG_STREAM, "session runner stopped");
    }
}
