use std::cell::Cell;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::ops::Add;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use controller_core::events::EventId;
use controller_core::interlock::ChargePathAction;
use controller_core::lines::{ALL_INPUTS, ALL_OUTPUTS, OutputLine, PowerPathDriver};
use controller_core::status::StatusFormatter;
use controller_core::{CycleReport, InterlockConfig, InterlockController, InterlockInputs};
use embedded_hal::delay::DelayNs;

const DEFAULT_CYCLE: Duration = Duration::from_millis(1);
const MAX_RUN: Duration = Duration::from_secs(600);

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("switch", "switch on|off                 - drive the SYS_SW input"),
    (
        "discharge",
        "discharge allow|inhibit       - drive the DSG_INH input",
    ),
    ("charge", "charge allow|inhibit          - drive the CHG_INH input"),
    (
        "select",
        "select mppt|external          - drive the CHG_SEL input",
    ),
    ("step", "step                          - run a single control cycle"),
    (
        "run",
        "run <ms> [cycle=<ms>]         - run cycles for a span of simulated time",
    ),
    (
        "status",
        "status                        - show state, outputs and indicator",
    ),
    ("events", "events                        - list the event journal"),
    ("help", "help [topic]                  - show help for a command"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Boot,
    Discharge,
    Handover,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Boot => "transcripts/emulator-boot.log",
            TranscriptProfile::Discharge => "transcripts/emulator-discharge.log",
            TranscriptProfile::Handover => "transcripts/emulator-handover.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Boot => "BatterBox emulator boot transcript",
            TranscriptProfile::Discharge => "BatterBox emulator discharge transcript",
            TranscriptProfile::Handover => "BatterBox emulator charger handover transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("boot") {
            Ok(Self::Boot)
        } else if tag.eq_ignore_ascii_case("discharge") {
            Ok(Self::Discharge)
        } else if tag.eq_ignore_ascii_case("handover") {
            Ok(Self::Handover)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

/// Simulated monotonic instant in microseconds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct HostInstant(u64);

impl HostInstant {
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1_000.0
    }
}

impl Add<Duration> for HostInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

/// Clock shared between the session, the delay, and the driver.
#[derive(Clone, Default)]
struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    fn now(&self) -> HostInstant {
        HostInstant(self.0.get())
    }

    fn advance(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.0.set(self.0.get().saturating_add(micros));
    }
}

/// Delay that skips simulated time forward instead of sleeping.
struct HostDelay {
    clock: SimClock,
}

impl DelayNs for HostDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(Duration::from_nanos(u64::from(ns)));
    }
}

/// Output line level change observed by the host driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct LineEdge {
    at: HostInstant,
    line: OutputLine,
    asserted: bool,
}

/// Stand-in for the GPIO driver that remembers levels and pending edges.
struct HostPowerPath {
    clock: SimClock,
    levels: [bool; ALL_OUTPUTS.len()],
    pending: Vec<LineEdge>,
}

impl HostPowerPath {
    fn new(clock: SimClock) -> Self {
        Self {
            clock,
            levels: [false; ALL_OUTPUTS.len()],
            pending: Vec::new(),
        }
    }

    fn level(&self, line: OutputLine) -> bool {
        self.levels[line.as_index()]
    }

    fn take_edges(&mut self) -> Vec<LineEdge> {
        std::mem::take(&mut self.pending)
    }
}

impl PowerPathDriver for HostPowerPath {
    fn drive(&mut self, line: OutputLine, asserted: bool) {
        let slot = &mut self.levels[line.as_index()];
        if *slot != asserted {
            *slot = asserted;
            self.pending.push(LineEdge {
                at: self.clock.now(),
                line,
                asserted,
            });
        }
    }
}

pub struct Session {
    controller: InterlockController<HostInstant>,
    clock: SimClock,
    driver: HostPowerPath,
    delay: HostDelay,
    inputs: InterlockInputs,
    event_cursor: EventId,
    transcript: TranscriptLogger,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        Self::with_transcript(transcript)
    }

    /// Session whose transcript is discarded.
    #[cfg(test)]
    pub fn detached() -> io::Result<Self> {
        Self::with_transcript(TranscriptLogger::discard())
    }

    fn with_transcript(transcript: TranscriptLogger) -> io::Result<Self> {
        let controller = InterlockController::new(InterlockConfig::new())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;
        let clock = SimClock::default();
        let driver = HostPowerPath::new(clock.clone());
        let delay = HostDelay {
            clock: clock.clone(),
        };

        let mut session = Self {
            controller,
            clock,
            driver,
            delay,
            inputs: InterlockInputs::idle(),
            event_cursor: 0,
            transcript,
        };

        let now = session.clock.now();
        session
            .controller
            .boot(now, &mut session.driver, &mut session.delay);
        session.driver.take_edges();
        let lines = session.drain_events();
        session.record_output(now, &lines)?;
        Ok(session)
    }

    #[cfg(test)]
    pub fn now(&self) -> HostInstant {
        self.clock.now()
    }

    pub fn indicator_on(&self) -> bool {
        self.driver.level(OutputLine::Indicator)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let started = self.clock.now();
        self.transcript
            .append_line(started, TranscriptRole::Host, trimmed)?;

        let mut words = trimmed.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let lines = match (command.as_str(), args.as_slice()) {
            ("help", []) => help_lines(None),
            ("help", [topic]) => help_lines(Some(*topic)),
            ("switch", [level]) => self.set_input("SYS_SW", level, &["on", "off"], |inputs, on| {
                inputs.system_switch = on;
            }),
            ("discharge", [level]) => {
                self.set_input("DSG_INH", level, &["inhibit", "allow"], |inputs, inhibit| {
                    inputs.discharge_inhibit = inhibit;
                })
            }
            ("charge", [level]) => {
                self.set_input("CHG_INH", level, &["inhibit", "allow"], |inputs, inhibit| {
                    inputs.charge_inhibit = inhibit;
                })
            }
            ("select", [source]) => {
                self.set_input("CHG_SEL", source, &["mppt", "external"], |inputs, mppt| {
                    inputs.charger_select = mppt;
                })
            }
            ("step", []) => self.run_cycles(1, DEFAULT_CYCLE),
            ("run", [span]) => self.handle_run(span, None),
            ("run", [span, cycle]) => self.handle_run(span, Some(*cycle)),
            ("status", []) => self.status_lines(),
            ("events", []) => self.event_lines(),
            _ => vec![format!(
                "ERR syntax `{trimmed}` (type `help` for commands)"
            )],
        };

        self.record_output(self.clock.now(), &lines)?;
        Ok(lines)
    }

    fn set_input(
        &mut self,
        name: &str,
        value: &str,
        &[high, low]: &[&str; 2],
        apply: impl FnOnce(&mut InterlockInputs, bool),
    ) -> Vec<String> {
        let level = if value.eq_ignore_ascii_case(high) {
            true
        } else if value.eq_ignore_ascii_case(low) {
            false
        } else {
            return vec![format!("ERR syntax expected `{high}` or `{low}`, got `{value}`")];
        };

        apply(&mut self.inputs, level);
        vec![format!(
            "OK input {name}={} (sampled on next cycle)",
            if level { "high" } else { "low" }
        )]
    }

    fn handle_run(&mut self, span: &str, cycle: Option<&str>) -> Vec<String> {
        let span = match parse_millis(span) {
            Ok(span) if span > Duration::ZERO && span <= MAX_RUN => span,
            Ok(_) => return vec![format!("ERR run span must be 1..={}ms", MAX_RUN.as_millis())],
            Err(err) => return vec![err],
        };
        let cycle = match cycle.map(|raw| raw.strip_prefix("cycle=").ok_or(raw)) {
            None => DEFAULT_CYCLE,
            Some(Ok(raw)) => match parse_millis(raw) {
                Ok(cycle) if cycle > Duration::ZERO => cycle,
                Ok(_) => return vec!["ERR cycle must be at least 1ms".to_string()],
                Err(err) => return vec![err],
            },
            Some(Err(raw)) => return vec![format!("ERR syntax unexpected `{raw}`")],
        };

        let cycles = (span.as_micros() / cycle.as_micros()).max(1);
        let cycles = usize::try_from(cycles).unwrap_or(usize::MAX);
        self.run_cycles(cycles, cycle)
    }

    fn run_cycles(&mut self, cycles: usize, cycle: Duration) -> Vec<String> {
        let started = self.clock.now();
        let mut handovers = Vec::new();

        for _ in 0..cycles {
            let cycle_start = self.clock.now();
            let report = self.controller.step(
                &self.inputs,
                cycle_start,
                &mut self.driver,
                &mut self.delay,
            );
            if let Some(line) = describe_handover(&report) {
                handovers.push(line);
            }
            // A handover already consumed part of the cycle.
            let next = cycle_start + cycle;
            if self.clock.now() < next {
                self.clock.advance(Duration::from_micros(next.0 - self.clock.now().0));
            }
        }

        let mut lines = vec![format!(
            "OK ran {cycles} cycle(s) +{:.3}ms -> +{:.3}ms",
            started.as_millis_f64(),
            self.clock.now().as_millis_f64(),
        )];
        lines.extend(self.drain_events());
        lines.extend(handovers);
        for edge in self.driver.take_edges() {
            if edge.line == OutputLine::Indicator {
                lines.push(format!(
                    "led {} +{:.3}ms",
                    if edge.asserted { "on" } else { "off" },
                    edge.at.as_millis_f64()
                ));
            }
        }
        lines
    }

    fn drain_events(&mut self) -> Vec<String> {
        let events = self.controller.events();
        let lines = events
            .since(self.event_cursor)
            .map(|event| {
                format!(
                    "event #{} +{:.3}ms {}",
                    event.id,
                    event.timestamp.as_millis_f64(),
                    event.kind
                )
            })
            .collect();
        self.event_cursor = events.next_id();
        lines
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = self.controller.snapshot();
        let formatter = StatusFormatter::new(&snapshot);

        let mut inputs = String::from("inputs");
        let levels = [
            self.inputs.system_switch,
            self.inputs.discharge_inhibit,
            self.inputs.charge_inhibit,
            self.inputs.charger_select,
        ];
        for (info, level) in ALL_INPUTS.iter().zip(levels) {
            inputs.push_str(&format!(" {}={}", info.name, if level { "high" } else { "low" }));
        }

        let mut state = String::new();
        let mut outputs = String::new();
        let mut indicator = String::new();
        // Writing into a String cannot fail.
        let _ = formatter.write_state_line(&mut state);
        let _ = formatter.write_outputs_line(&mut outputs);
        let _ = formatter.write_indicator_line(&mut indicator);

        vec![
            format!("time +{:.3}ms", self.clock.now().as_millis_f64()),
            inputs,
            state,
            outputs,
            indicator,
        ]
    }

    fn event_lines(&self) -> Vec<String> {
        let events = self.controller.events();
        if events.is_empty() {
            return vec!["no events recorded".to_string()];
        }
        events
            .oldest_first()
            .map(|event| {
                format!(
                    "#{:<4} +{:>10.3}ms {}",
                    event.id,
                    event.timestamp.as_millis_f64(),
                    event.kind
                )
            })
            .collect()
    }

    fn record_output(&mut self, at: HostInstant, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.transcript
                .append_line(at, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn describe_handover(report: &CycleReport) -> Option<String> {
    match report.charge_path {
        ChargePathAction::Handover { from, to } => Some(format!(
            "handover {from} -> {to} (break-before-make complete)"
        )),
        ChargePathAction::Open | ChargePathAction::Hold(_) => None,
    }
}

fn parse_millis(raw: &str) -> Result<Duration, String> {
    let digits = raw.strip_suffix("ms").unwrap_or(raw);
    digits
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("ERR syntax expected milliseconds, got `{raw}`"))
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

struct TranscriptLogger {
    writer: BufWriter<Box<dyn Write>>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(Box::new(file)),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    #[cfg(test)]
    fn discard() -> Self {
        Self {
            writer: BufWriter::new(Box::new(io::sink())),
        }
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since power-up"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        at: HostInstant,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>10.3} ms] {} {}",
            at.as_millis_f64(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
