use crate::bit::Bit;
use crate::bus::MemoryBus;
use crate::keyboard::{KBD, KBDSTRB};
use crate::memory::DEBUG_BYTE;
use crate::poll::{PollError, Poller};
use crate::serial::{
    INIT_COMMAND, INIT_CONTROL, RX_FULL_BIT, SERIAL_COMMAND, SERIAL_CONTROL, SERIAL_DATA,
    SERIAL_STATUS,
};

// Single-letter monitor commands. Decoding is total: every byte maps to
// exactly one command, with unmatched bytes falling through to echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    InitSerial,
    ReadData,
    Status,
    PollEcho,
    ReadCommand,
    CommandLoop,
    DebugByte,
    Echo(u8),
}

impl Command {
    pub fn decode(key: u8) -> Self {
        match key {
            b'I' => Command::InitSerial,
            b'R' | b'E' => Command::ReadData,
            b'S' => Command::Status,
            b'P' => Command::PollEcho,
            b'C' => Command::ReadCommand,
            b'L' => Command::CommandLoop,
            b'D' => Command::DebugByte,
            other => Command::Echo(other),
        }
    }
}

// Character sink for monitor output. The host owns the actual terminal; the
// board only ever pushes bytes at it.
pub trait Console {
    fn putc(&mut self, b: u8);

    fn puts(&mut self, s: &str) {
        for b in s.bytes() {
            self.putc(b);
        }
    }

    // Two uppercase hex digits, the way the board ROM printed bytes.
    fn put_hex(&mut self, b: u8) {
        const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
        self.putc(DIGITS[(b >> 4) as usize]);
        self.putc(DIGITS[(b & 0x0F) as usize]);
    }
}

pub struct Monitor<C: Console> {
    pub console: C,
    poller: Poller,
}

impl<C: Console> Monitor<C> {
    pub fn new(console: C, poller: Poller) -> Self {
        Self { console, poller }
    }

    pub fn greet(&mut self) {
        self.console.puts("demoboard monitor\r\n");
    }

    // Consume one pending key, if any, and run its command.
    pub fn step(&mut self, bus: &mut impl MemoryBus) -> Result<(), PollError> {
        let latch = bus.read_byte(KBD);
        if !latch.bit(7) {
            return Ok(());
        }
        bus.read_byte(KBDSTRB);
        self.dispatch(bus, Command::decode(latch & 0x7F))
    }

    pub fn dispatch(&mut self, bus: &mut impl MemoryBus, cmd: Command) -> Result<(), PollError> {
        match cmd {
            Command::InitSerial => self.init_serial(bus),
            Command::ReadData => self.print_data(bus),
            Command::Status => self.print_status(bus),
            Command::PollEcho => self.poll_echo(bus)?,
            Command::ReadCommand => self.read_cmd(bus)?,
            Command::CommandLoop => self.read_cmd_loop(bus)?,
            Command::DebugByte => self.print_debug(bus),
            Command::Echo(b) => self.console.putc(b),
        }
        Ok(())
    }

    // Idempotent: the configuration latches just take the same two bytes
    // again.
    fn init_serial(&mut self, bus: &mut impl MemoryBus) {
        bus.write_byte(SERIAL_COMMAND, INIT_COMMAND);
        bus.write_byte(SERIAL_CONTROL, INIT_CONTROL);
        self.console.puts("Ok, initialized serial.\r\n");
    }

    fn print_data(&mut self, bus: &mut impl MemoryBus) {
        self.console.puts("read/write register: ");
        let b = bus.read_byte(SERIAL_DATA);
        self.console.put_hex(b);
        self.console.puts("\r\n");
    }

    // Raw status byte, no interpretation.
    fn print_status(&mut self, bus: &mut impl MemoryBus) {
        self.console.puts("status byte: ");
        let b = bus.read_byte(SERIAL_STATUS);
        self.console.put_hex(b);
        self.console.puts("\r\n");
    }

    fn print_debug(&mut self, bus: &mut impl MemoryBus) {
        self.console.puts("debugging byte: ");
        let b = bus.read_byte(DEBUG_BYTE);
        self.console.put_hex(b);
    }

    // Wait for one byte off the wire and echo it to the console.
    pub fn poll_echo(&mut self, bus: &mut impl MemoryBus) -> Result<(), PollError> {
        self.poller.wait(bus, SERIAL_STATUS, RX_FULL_BIT)?;
        let b = bus.read_byte(SERIAL_DATA);
        self.console.putc(b);
        Ok(())
    }

    // Wait for one byte off the wire and run it as a command. A command
    // reader arriving over the wire cannot nest; it echoes instead.
    pub fn read_cmd(&mut self, bus: &mut impl MemoryBus) -> Result<(), PollError> {
        self.poller.wait(bus, SERIAL_STATUS, RX_FULL_BIT)?;
        let b = bus.read_byte(SERIAL_DATA);
        let cmd = match Command::decode(b) {
            Command::ReadCommand | Command::CommandLoop => Command::Echo(b),
            cmd => cmd,
        };
        self.dispatch(bus, cmd)
    }

    // Serve commands off the wire until the poller gives up. With an
    // unbounded poller this never returns, like the hardware loop.
    pub fn read_cmd_loop(&mut self, bus: &mut impl MemoryBus) -> Result<(), PollError> {
        loop {
            match self.read_cmd(bus) {
                Ok(()) => {}
                Err(PollError::Exhausted(_)) => return Ok(()),
            }
        }
    }

    // Echo everything off the wire until the poller gives up.
    pub fn listen(&mut self, bus: &mut impl MemoryBus) -> Result<(), PollError> {
        loop {
            match self.poll_echo(bus) {
                Ok(()) => {}
                Err(PollError::Exhausted(_)) => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::Memory;

    struct Transcript(Vec<u8>);

    impl Console for Transcript {
        fn putc(&mut self, b: u8) {
            self.0.push(b);
        }
    }

    fn new_monitor() -> Monitor<Transcript> {
        Monitor::new(Transcript(Vec::new()), Poller::with_budget(16))
    }

    fn text(monitor: &Monitor<Transcript>) -> String {
        String::from_utf8(monitor.console.0.clone()).unwrap()
    }

    #[test]
    fn decode_is_total() {
        for key in 0..=255u8 {
            let cmd = Command::decode(key);
            match key {
                b'I' => assert_eq!(cmd, Command::InitSerial),
                b'R' | b'E' => assert_eq!(cmd, Command::ReadData),
                b'S' => assert_eq!(cmd, Command::Status),
                b'P' => assert_eq!(cmd, Command::PollEcho),
                b'C' => assert_eq!(cmd, Command::ReadCommand),
                b'L' => assert_eq!(cmd, Command::CommandLoop),
                b'D' => assert_eq!(cmd, Command::DebugByte),
                other => assert_eq!(cmd, Command::Echo(other)),
            }
        }
    }

    #[test]
    fn init_writes_config_and_confirms() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        monitor.dispatch(&mut mem, Command::InitSerial).unwrap();
        assert_eq!(text(&monitor), "Ok, initialized serial.\r\n");
        assert_eq!(mem.read_byte(SERIAL_COMMAND), 0x0B);
        assert_eq!(mem.read_byte(SERIAL_CONTROL), 0x1E);

        // Running it again changes nothing.
        monitor.dispatch(&mut mem, Command::InitSerial).unwrap();
        assert_eq!(mem.read_byte(SERIAL_COMMAND), 0x0B);
    }

    #[test]
    fn status_prints_hex() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        // Idle ACIA: transmit-empty only.
        monitor.dispatch(&mut mem, Command::Status).unwrap();
        assert_eq!(text(&monitor), "status byte: 10\r\n");
    }

    #[test]
    fn data_register_prints_hex() {
        let mut mem = Memory::new(None);
        mem.serial.receive(0xBE);
        let mut monitor = new_monitor();

        monitor.dispatch(&mut mem, Command::ReadData).unwrap();
        assert_eq!(text(&monitor), "read/write register: BE\r\n");
    }

    #[test]
    fn debug_byte_prints_without_newline() {
        let mut mem = Memory::new(None);
        mem.write_byte(DEBUG_BYTE, 0x5C);
        let mut monitor = new_monitor();

        monitor.dispatch(&mut mem, Command::DebugByte).unwrap();
        assert_eq!(text(&monitor), "debugging byte: 5C");
    }

    #[test]
    fn unmatched_keys_echo() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        monitor.dispatch(&mut mem, Command::decode(b'z')).unwrap();
        monitor.dispatch(&mut mem, Command::decode(b'!')).unwrap();
        assert_eq!(text(&monitor), "z!");
    }

    #[test]
    fn poll_echo_waits_for_ready() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        assert_eq!(
            monitor.dispatch(&mut mem, Command::PollEcho),
            Err(PollError::Exhausted(16))
        );

        mem.serial.receive(b'h');
        monitor.dispatch(&mut mem, Command::PollEcho).unwrap();
        assert_eq!(text(&monitor), "h");
    }

    #[test]
    fn read_cmd_runs_wire_bytes_as_commands() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        mem.serial.receive(b'S');
        monitor.dispatch(&mut mem, Command::ReadCommand).unwrap();
        assert_eq!(text(&monitor), "status byte: 10\r\n");
    }

    #[test]
    fn command_loop_drains_the_wire() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        // The status command runs after its trigger byte is consumed, so the
        // receive-ready bit is already down again.
        mem.serial.receive(b'S');
        monitor.dispatch(&mut mem, Command::CommandLoop).unwrap();
        assert_eq!(text(&monitor), "status byte: 10\r\n");
    }

    #[test]
    fn greet_banner() {
        let mut monitor = new_monitor();
        monitor.greet();
        assert_eq!(text(&monitor), "demoboard monitor\r\n");
    }

    #[test]
    fn read_cmd_does_not_nest() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        mem.serial.receive(b'C');
        monitor.dispatch(&mut mem, Command::ReadCommand).unwrap();
        assert_eq!(text(&monitor), "C");
    }

    #[test]
    fn listen_echoes_until_dry() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        mem.serial.receive(b'a');
        monitor.listen(&mut mem).unwrap();
        assert_eq!(text(&monitor), "a");
    }

    #[test]
    fn step_consumes_the_key_latch() {
        let mut mem = Memory::new(None);
        let mut monitor = new_monitor();

        mem.keyboard.key_down(b'I');
        monitor.step(&mut mem).unwrap();
        assert_eq!(text(&monitor), "Ok, initialized serial.\r\n");

        // Strobe is gone: stepping again does nothing.
        monitor.step(&mut mem).unwrap();
        assert_eq!(text(&monitor), "Ok, initialized serial.\r\n");
    }
}
