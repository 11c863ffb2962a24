use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{Read, Write},
    rc::Rc,
    sync::mpsc,
    thread,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use minifb::{InputCallback, Key, Scale, Window, WindowOptions};

use demoboard_core::{
    machine::Machine,
    monitor::Console,
    poll::{PollError, Poller},
    SCREEN_HEIGHT, SCREEN_WIDTH,
};


// Poll budget for interactive commands, so the window loop cannot stall on
// an idle wire. A byte already latched is caught on the first read.
const POLL_BUDGET: u32 = 4_096;

#[derive(Parser)]
#[command(about = "An emulated 8-bit demo board with a serial monitor.")]
struct Args {
    #[arg(value_enum, default_value_t, help = "Demo to run")]
    mode: Mode,

    #[arg(short = 'x', long, help = "Display scale factor")]
    #[arg(value_enum, default_value_t)]
    scale: DisplayScale,

    #[arg(short, long, help = "Print serial transmits to stdout")]
    #[arg(default_value = "false")]
    serial: bool,
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
enum Mode {
    // Interactive monitor: typed keys run commands, stdin feeds the wire.
    #[default]
    Monitor,
    // The tile-screen hello demo.
    Tiles,
    // The hires soft-switch demo.
    Hires,
    // Echo stdin through the serial port; no window.
    Listen,
}

// Copy of minifb::Scale such that it implements clap::ValueEnum.
#[derive(ValueEnum, Clone, Copy, Default, Debug)]
enum DisplayScale {
    X1,
    #[default]
    X2,
    X4,
    X8,
}

struct StdoutConsole;

impl Console for StdoutConsole {
    fn putc(&mut self, b: u8) {
        print!("{}", b as char);
        let _ = std::io::stdout().flush();
    }
}

// Typed characters land here from the window's input callback.
struct KeyBuffer(Rc<RefCell<VecDeque<u8>>>);

impl InputCallback for KeyBuffer {
    fn add_char(&mut self, uni_char: u32) {
        if let Some(c) = char::from_u32(uni_char).filter(char::is_ascii) {
            self.0.borrow_mut().push_back(c as u8);
        }
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let callback: Option<Box<dyn Fn(u8)>> = if args.serial {
        Some(Box::new(|b: u8| {
            print!("{}", b as char);
            let _ = std::io::stdout().flush();
        }))
    } else {
        None
    };

    let mut machine = Machine::new(StdoutConsole, Poller::with_budget(POLL_BUDGET), callback);
    log::info!("starting in {:?} mode", args.mode);

    match args.mode {
        Mode::Listen => return listen(&mut machine),
        Mode::Tiles => machine.hello_tiles(),
        Mode::Hires => machine.enter_hires(),
        Mode::Monitor => machine.greet(),
    }

    run_window(machine, args.scale, matches!(args.mode, Mode::Monitor))
}

// Echo every byte arriving on stdin back out through the serial port.
fn listen(machine: &mut Machine<StdoutConsole>) -> Result<()> {
    log::info!("echoing serial input from stdin, ^C to quit");
    for byte in std::io::stdin().lock().bytes() {
        machine.serial_receive(byte.context("failed reading stdin")?);
        machine.poll_echo()?;
    }
    Ok(())
}

fn run_window(
    mut machine: Machine<StdoutConsole>,
    scale: DisplayScale,
    interactive: bool,
) -> Result<()> {
    let opts = WindowOptions {
        scale: match scale {
            DisplayScale::X1 => Scale::X1,
            DisplayScale::X2 => Scale::X2,
            DisplayScale::X4 => Scale::X4,
            DisplayScale::X8 => Scale::X8,
        },
        ..Default::default()
    };

    let mut window = Window::new("demoboard", SCREEN_WIDTH, SCREEN_HEIGHT, opts)
        .context("failed to create window")?;

    let key_buffer = interactive.then(|| {
        let buffer = Rc::new(RefCell::new(VecDeque::new()));
        window.set_input_callback(Box::new(KeyBuffer(Rc::clone(&buffer))));
        buffer
    });

    // Serial input comes off a reader thread so the window never blocks on
    // stdin.
    let serial_rx = interactive.then(spawn_stdin_reader);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(rx) = &serial_rx {
            while let Ok(b) = rx.try_recv() {
                machine.serial_receive(b);
            }
        }

        if let Some(keys) = &key_buffer {
            let pending: Vec<u8> = keys.borrow_mut().drain(..).collect();
            for key in pending {
                machine.key_down(key);
                if let Err(PollError::Exhausted(_)) = machine.step() {
                    log::debug!("poll gave up, no serial data pending");
                }
            }
        }

        if machine.display_updated() {
            window
                .update_with_buffer(machine.render(), SCREEN_WIDTH, SCREEN_HEIGHT)
                .context("failed to update display")?;
        } else {
            window.update();
        }
    }

    Ok(())
}

fn spawn_stdin_reader() -> mpsc::Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for byte in std::io::stdin().lock().bytes().flatten() {
            if tx.send(byte).is_err() {
                break;
            }
        }
    });
    rx
}
