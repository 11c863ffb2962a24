use crate::demo;
use crate::memory::Memory;
use crate::monitor::{Console, Monitor};
use crate::poll::{PollError, Poller};
use crate::serial::SerialCallback;

// The assembled board: devices on the bus plus the monitor program that
// drives them. Hosts push keys and serial bytes in, and pull pixels and
// console bytes out.
pub struct Machine<C: Console> {
    pub mem: Memory,
    pub monitor: Monitor<C>,
}

impl<C: Console> Machine<C> {
    pub fn new(console: C, poller: Poller, serial_out: SerialCallback) -> Self {
        Self {
            mem: Memory::new(serial_out),
            monitor: Monitor::new(console, poller),
        }
    }

    pub fn greet(&mut self) {
        self.monitor.greet();
    }

    pub fn key_down(&mut self, key: u8) {
        self.mem.keyboard.key_down(key);
    }

    pub fn serial_receive(&mut self, b: u8) {
        self.mem.serial.receive(b);
    }

    // Run the monitor over one pending keypress, if any.
    pub fn step(&mut self) -> Result<(), PollError> {
        self.monitor.step(&mut self.mem)
    }

    pub fn hello_tiles(&mut self) {
        demo::hello_tiles(&mut self.mem);
    }

    pub fn enter_hires(&mut self) {
        demo::enter_hires(&mut self.mem);
    }

    pub fn poll_echo(&mut self) -> Result<(), PollError> {
        self.monitor.poll_echo(&mut self.mem)
    }

    pub fn listen(&mut self) -> Result<(), PollError> {
        self.monitor.listen(&mut self.mem)
    }

    // Check if the display buffer needs redrawing since last call.
    pub fn display_updated(&mut self) -> bool {
        self.mem.video.check_updated()
    }

    // Repaint and hand out the pixel buffer for the host window.
    pub fn render(&mut self) -> &[u32] {
        self.mem.video.render();
        &self.mem.video.pixels
    }
}
