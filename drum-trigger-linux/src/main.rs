mod config;
mod input;
mod leds;
mod midi;
mod nvm;
mod tui;

use color_eyre::eyre::{Result, WrapErr};
use crossterm::event::{self, Event};
use drum_trigger_core::{Cmd, Effect, Millis};
use input::Action;
use ratatui::DefaultTerminal;
use std::{cell::RefCell, path::PathBuf, rc::Rc, time::Instant};
use tracing_subscriber::EnvFilter;

pub const VOICE_COUNT: usize = 4;
/// room for 32 steps
pub const PATTERN_BYTES: usize = 4;
pub const LED_CHIPS: usize = 2;

pub type Sequencer = drum_trigger_core::Sequencer<VOICE_COUNT, PATTERN_BYTES>;

const POLL: std::time::Duration = std::time::Duration::from_millis(1);

struct App {
    seq: Sequencer,
    nvm: nvm::FileNvm,
    midi: midi::MidiTrigger,
    leds: leds::Leds,
    chain: Rc<RefCell<leds::Chain>>,
    start: Instant,
    /// step that fired last
    step: Option<usize>,
}

impl App {
    /// wraps like the target's millisecond counter
    fn now(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.refresh()?;
        terminal.draw(|frame| self.draw(frame))?;
        loop {
            let mut flush = false;
            if event::poll(POLL)? {
                if let Event::Key(key) = event::read()? {
                    match input::action(key) {
                        Some(Action::Quit) => break,
                        Some(Action::Cmd(cmd)) => {
                            self.cmd(cmd)?;
                            flush = true;
                        }
                        None => (),
                    }
                }
            }
            let now = self.now();
            if let Some(step) = self.seq.poll(now, &mut self.midi)? {
                self.step = Some(step);
                flush = true;
            }
            if flush {
                terminal.draw(|frame| self.draw(frame))?;
            }
        }
        Ok(())
    }

    fn cmd(&mut self, cmd: Cmd) -> Result<()> {
        let now = self.now();
        let effect = match self.seq.cmd(cmd, now) {
            Ok(effect) => effect,
            Err(e) => {
                tracing::warn!(?cmd, %e, "rejected");
                return Ok(());
            }
        };
        match effect {
            Some(Effect::Redraw) => self.refresh()?,
            Some(Effect::Display(value)) => tracing::debug!(display = ?value),
            Some(Effect::Started) => tracing::info!(tempo = self.seq.tempo(), "play"),
            Some(Effect::Save) => {
                self.step = None;
                tracing::info!(voices = ?self.seq.voices, "stop");
                if let Err(e) = self.seq.save(&mut self.nvm) {
                    tracing::error!(%e, "saving state");
                }
            }
            None => (),
        }
        Ok(())
    }

    /// push every pattern bit down the led chain
    fn refresh(&mut self) -> Result<()> {
        let steps = self.seq.steps();
        let chain = &mut self.leds;
        chain.clear();
        self.seq
            .render(|voice, step, on| chain.set(leds::led_index(voice, step, steps), on));
        chain.flush()?;
        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame) {
        let chain = self.chain.borrow();
        let panel = tui::Panel {
            seq: &self.seq,
            chain: &chain,
            step: self.step,
        };
        frame.render_widget(panel, frame.area());
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::Config::load(path.as_deref())?;

    let log = std::fs::File::create(&config.log)
        .wrap_err_with(|| format!("creating log {}", config.log.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut seq = config.sequencer()?;
    let mut nvm = nvm::FileNvm::new(&config.nvm);
    match seq.load(&mut nvm) {
        Ok(true) => tracing::info!(path = %config.nvm.display(), "restored saved state"),
        Ok(false) => tracing::info!("no saved state, using kit defaults"),
        Err(e) => tracing::warn!(%e, "reading saved state"),
    }

    let midi = midi::MidiTrigger::connect(config.midi_port.as_deref())?;
    let (mut leds, chain) = leds::init();
    leds.configure(config.led_config)?;
    tracing::debug!(code = ?chain.borrow().config(), "led chips configured");

    let mut app = App {
        seq,
        nvm,
        midi,
        leds,
        chain,
        start: Instant::now(),
        step: None,
    };
    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();
    result
}
