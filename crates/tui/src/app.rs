use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use bargain_core::{
    backend::BargainBackend,
    config::AppConfig,
    error::BargainError,
    models::Price,
    negotiation::{Acceptance, Deal, Decline, Negotiation, OfferRequest, PriceChoice, RoundPhase},
    round::{InputMode, RoundAction, RoundInput},
    timer::{
        format_remaining, Clock, TimerEvent, TimerHandle, TimerSource, TimerStatus, TimerUpdate,
    },
};

use crate::countdown_font;

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
    danger: Color,
    supplier: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
            supplier: Color::Magenta,
        }
    }
}

impl Theme {
    fn status_color(&self, status: TimerStatus) -> Color {
        match status {
            TimerStatus::Active(_) => self.success,
            TimerStatus::ExpiringSoon(_) => self.warning,
            TimerStatus::Expired => self.danger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    Agent,
    Supplier,
    User,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::Agent => "Agent",
            Speaker::Supplier => "Supplier",
            Speaker::User => "You",
        }
    }
}

#[derive(Debug, Clone)]
struct ChatLine {
    speaker: Speaker,
    text: String,
    at: DateTime<Local>,
}

enum AppEvent {
    Input(Event),
    Tick,
    CounterOffer(std::result::Result<Price, BargainError>),
}

/// Terminal front end driving a single negotiation.
pub struct BargainApp {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn BargainBackend>,
    negotiation: Negotiation,
    input: RoundInput,
    offer_timer: TimerHandle,
    session_timer: TimerHandle,
    hold_timer: TimerHandle,
    offer_status: Option<TimerStatus>,
    session_status: Option<TimerStatus>,
    hold_status: Option<TimerStatus>,
    timer_rx: Option<mpsc::Receiver<TimerUpdate>>,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: Option<mpsc::Receiver<AppEvent>>,
    suggestion_cursor: usize,
    log: Vec<ChatLine>,
    status: String,
    should_quit: bool,
    theme: Theme,
}

impl BargainApp {
    pub fn new(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        backend: Arc<dyn BargainBackend>,
    ) -> Result<Self> {
        let product = config.product()?;
        let negotiation = Negotiation::new(product, config.negotiation_settings());
        let input = RoundInput::new(negotiation.round_props(clock.now()));

        let (event_tx, event_rx) = mpsc::channel(128);
        let (timer_tx, timer_rx) = mpsc::channel(64);
        let settings = config.timer_settings();
        let offer_timer =
            TimerHandle::new(Arc::clone(&clock), timer_tx.clone(), settings, TimerSource::Offer);
        let session_timer = TimerHandle::new(
            Arc::clone(&clock),
            timer_tx.clone(),
            settings,
            TimerSource::Session,
        );
        let hold_timer =
            TimerHandle::new(Arc::clone(&clock), timer_tx, settings, TimerSource::PriceHold);

        Ok(Self {
            config,
            clock,
            backend,
            negotiation,
            input,
            offer_timer,
            session_timer,
            hold_timer,
            offer_status: None,
            session_status: None,
            hold_status: None,
            timer_rx: Some(timer_rx),
            event_tx,
            event_rx: Some(event_rx),
            suggestion_cursor: 0,
            log: Vec::new(),
            status: "Ready".to_string(),
            should_quit: false,
            theme: Theme::default(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let now = self.clock.now();
        if let Some(length) = self.config.session_length() {
            self.session_timer.reset(Some(now + length));
        }
        let product = self.negotiation.product().clone();
        self.say(
            Speaker::Agent,
            format!(
                "Listed at {}. What price would you like to pay for {}?",
                product.format(product.base_price),
                product.name
            ),
        );
        self.set_status(format!(
            "Round 1 of {} • type a price and press Enter",
            self.negotiation.total_rounds()
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let mut event_rx = self
            .event_rx
            .take()
            .context("event channel already consumed")?;
        spawn_input_thread(self.event_tx.clone());
        let mut timer_rx = self
            .timer_rx
            .take()
            .context("timer channel already consumed")?;

        let result = loop {
            if let Err(err) = terminal.draw(|frame| self.draw(frame)) {
                break Err(err.into());
            }
            if self.should_quit {
                break Ok(());
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    if !self.process_app_event(maybe_event) {
                        break Ok(());
                    }
                }
                Some(update) = timer_rx.recv() => self.handle_timer_update(update),
            }
        };

        self.offer_timer.cancel();
        self.session_timer.cancel();
        self.hold_timer.cancel();
        restore_terminal(&mut terminal)?;
        result
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(Event::Key(key))) => {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
                true
            }
            Some(AppEvent::Input(_)) => true,
            Some(AppEvent::Tick) => {
                self.sync_input();
                true
            }
            Some(AppEvent::CounterOffer(result)) => {
                self.handle_counter_offer(result);
                true
            }
            None => false,
        }
    }

    /// Push the negotiation's current view into the input control.
    fn sync_input(&mut self) {
        let now = self.clock.now();
        self.negotiation.expire(now);
        self.input.set_props(self.negotiation.round_props(now));
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                None
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                if self.input.mode() == InputMode::New {
                    self.input.push_char(ch);
                }
                None
            }
            KeyCode::Backspace => {
                self.input.backspace();
                None
            }
            KeyCode::Enter => {
                let action = self.input.submit();
                if action.is_none() && self.input.mode() == InputMode::New && !self.input.is_disabled() {
                    self.set_status("Please enter a valid price amount".to_string());
                }
                action
            }
            KeyCode::Char('n') => {
                self.input.enter_new_mode();
                None
            }
            KeyCode::Char('r') => self.input.reuse(),
            KeyCode::Char('a') => {
                if self.negotiation.phase() == RoundPhase::ReceivedCounter {
                    self.accept_current();
                    None
                } else {
                    self.input.accept_previous()
                }
            }
            KeyCode::Char('d') => {
                self.decline_current();
                None
            }
            KeyCode::Char('s') => {
                self.select_price(PriceChoice::Safe);
                None
            }
            KeyCode::Char('f') => {
                self.select_price(PriceChoice::Final);
                None
            }
            KeyCode::Tab => {
                self.cycle_suggestion();
                None
            }
            _ => None,
        };

        if let Some(action) = action {
            self.apply_round_action(action);
        }
    }

    fn apply_round_action(&mut self, action: RoundAction) {
        let now = self.clock.now();
        match action {
            RoundAction::Send(price) => match self.negotiation.submit(price, now) {
                Ok(request) => {
                    let product = self.negotiation.product().clone();
                    self.offer_timer.reset(None);
                    self.offer_status = None;
                    self.say(Speaker::User, format!("I'd like to pay {}", product.format(price)));
                    let checking = if self.negotiation.is_final_round() {
                        format!("Final check at {}…", product.format(price))
                    } else {
                        format!("Let me check with the supplier about {}…", product.format(price))
                    };
                    self.say(Speaker::Agent, checking);
                    self.set_status("Waiting for the supplier…".to_string());
                    self.request_counter_offer(request);
                }
                Err(BargainError::OfferTooHigh { base, .. }) => {
                    let product = self.negotiation.product().clone();
                    self.say(
                        Speaker::Agent,
                        format!(
                            "That's at or above our current price of {}. You can book now at this rate.",
                            product.format(base)
                        ),
                    );
                }
                Err(err) => self.set_status(format!("Cannot send price: {err}")),
            },
            RoundAction::AcceptPrevious => match self.negotiation.accept_previous(now) {
                Ok(deal) => self.on_booked(deal),
                Err(err) => {
                    warn!(%err, "previous offer could not be accepted");
                    self.set_status(format!("Previous offer unavailable: {err}"));
                }
            },
        }
        self.sync_input();
    }

    fn request_counter_offer(&mut self, request: OfferRequest) {
        let sender = self.event_tx.clone();
        let backend = Arc::clone(&self.backend);
        let delay = self.config.response_delay();
        debug!(round = request.round, target = %request.target, "requesting counter-offer");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = backend.counter_offer(&request);
            if sender.send(AppEvent::CounterOffer(result)).await.is_err() {
                debug!("app closed before counter-offer arrived");
            }
        });
    }

    fn handle_counter_offer(&mut self, result: std::result::Result<Price, BargainError>) {
        let now = self.clock.now();
        let counter = match result {
            Ok(counter) => counter,
            Err(err) => {
                error!(%err, "counter-offer request failed");
                self.negotiation.counter_failed();
                self.say(
                    Speaker::Agent,
                    "The supplier could not be reached. Please try again.".to_string(),
                );
                self.sync_input();
                return;
            }
        };

        let target = self.negotiation.current().target_price;
        let deadline = match self.negotiation.receive_counter(counter, now) {
            Ok(deadline) => deadline,
            Err(err) => {
                warn!(%err, "ignoring unexpected counter-offer");
                return;
            }
        };
        self.offer_timer.reset(Some(deadline));
        self.suggestion_cursor = 0;

        let product = self.negotiation.product().clone();
        let offer = product.format(counter);
        let window = format_remaining(self.negotiation.settings().offer_window.num_seconds().max(0) as u64);
        if target == Some(counter) {
            self.say(Speaker::Supplier, format!("Congratulations! Your price {offer} is matched!"));
        } else if self.negotiation.is_final_round() {
            self.say(Speaker::Supplier, format!("Today's offer is {offer}."));
        } else {
            self.say(Speaker::Supplier, format!("Good news, we can offer {offer}."));
        }

        let advice = if !self.negotiation.is_final_round() {
            format!("Accept to lock {offer}, or decline to try your final bargain. You have {window}.")
        } else if let Some(safe) = self.negotiation.safe_deal() {
            format!(
                "Final offer: {offer}. Pick your safe deal {} or this offer within {window}.",
                product.format(safe)
            )
        } else {
            format!("Final offer: {offer}. You have {window} to choose.")
        };
        self.say(Speaker::Agent, advice);
        self.set_status("Offer on the table".to_string());
        self.sync_input();
    }

    fn accept_current(&mut self) {
        let now = self.clock.now();
        match self.negotiation.accept(now) {
            Ok(Acceptance::SafeDealLocked(price)) => {
                self.offer_timer.reset(None);
                self.offer_status = None;
                let product = self.negotiation.product().clone();
                self.say(
                    Speaker::Agent,
                    format!(
                        "Price locked: {}. Enter your final price to try for a better deal!",
                        product.format(price)
                    ),
                );
                self.set_status(format!(
                    "Round {} of {}",
                    self.negotiation.round(),
                    self.negotiation.total_rounds()
                ));
            }
            Ok(Acceptance::Booked(deal)) => self.on_booked(deal),
            Err(err) => self.set_status(format!("Cannot accept: {err}")),
        }
        self.sync_input();
    }

    fn decline_current(&mut self) {
        let now = self.clock.now();
        match self.negotiation.decline(now) {
            Ok(Decline::NextRound(round)) => {
                self.offer_timer.reset(None);
                self.offer_status = None;
                self.say(
                    Speaker::Agent,
                    format!(
                        "No problem. Round {round} of {}: enter a new price, or take the previous offer while it lasts.",
                        self.negotiation.total_rounds()
                    ),
                );
            }
            Ok(Decline::Exhausted) => {
                self.offer_timer.reset(None);
                self.offer_status = None;
                self.say(
                    Speaker::Agent,
                    format!(
                        "You've used all {} attempts. The listed price still applies.",
                        self.negotiation.total_rounds()
                    ),
                );
                self.set_status("Negotiation ended without a deal".to_string());
            }
            Err(err) => self.set_status(format!("Nothing to decline: {err}")),
        }
        self.sync_input();
    }

    fn select_price(&mut self, choice: PriceChoice) {
        match self.negotiation.select(choice) {
            Ok(()) => {
                let label = match choice {
                    PriceChoice::Safe => "safe deal",
                    PriceChoice::Final => "final offer",
                };
                self.set_status(format!("Selected the {label}; press a to book"));
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn cycle_suggestion(&mut self) {
        let Some(floor) = self.config.suggestion_floor() else {
            return;
        };
        let suggestions = self.negotiation.suggestions(floor);
        if suggestions.is_empty() || self.input.is_disabled() {
            return;
        }
        let price = suggestions[self.suggestion_cursor % suggestions.len()];
        self.suggestion_cursor = (self.suggestion_cursor + 1) % suggestions.len();
        self.input.enter_new_mode();
        self.input.set_text(&price.to_string());
    }

    fn on_booked(&mut self, deal: Deal) {
        self.offer_timer.reset(None);
        self.offer_status = None;
        self.hold_timer.reset(Some(deal.hold_expires_at));

        let product = self.negotiation.product().clone();
        let reference = format!("BRG_{}", deal.accepted_at.timestamp_millis());
        info!(
            reference = %reference,
            price = %deal.price,
            savings = deal.savings(),
            "booking hold created"
        );
        self.say(
            Speaker::Agent,
            format!(
                "Excellent! {} is held until {}. Reference: {reference}. You save {}.",
                product.format(deal.price),
                deal.hold_expires_at.with_timezone(&Local).format("%H:%M"),
                Price::new(deal.savings())
                    .map(|savings| product.format(savings))
                    .unwrap_or_else(|| "nothing".to_string())
            ),
        );
        self.set_status("Deal booked • press q to leave".to_string());
    }

    fn handle_timer_update(&mut self, update: TimerUpdate) {
        let handle = match update.source {
            TimerSource::Offer => &self.offer_timer,
            TimerSource::Session => &self.session_timer,
            TimerSource::PriceHold => &self.hold_timer,
        };
        if !handle.is_current(&update) {
            debug!(source = %update.source, generation = update.generation, "dropping stale timer update");
            return;
        }

        match update.source {
            TimerSource::Offer => self.offer_status = Some(update.status),
            TimerSource::Session => self.session_status = Some(update.status),
            TimerSource::PriceHold => self.hold_status = Some(update.status),
        }

        match update.event {
            Some(TimerEvent::Expired) => {
                info!(source = %update.source, "countdown expired");
                if update.source == TimerSource::Offer {
                    self.negotiation.expire(self.clock.now());
                }
                self.say(Speaker::Agent, update.source.message(TimerStatus::Expired));
                self.sync_input();
            }
            Some(TimerEvent::ExpiringSoon) if update.source != TimerSource::Offer => {
                self.set_status(update.source.message(update.status));
            }
            _ => {}
        }
    }

    fn say(&mut self, speaker: Speaker, text: String) {
        debug!(speaker = speaker.label(), %text, "chat");
        self.log.push(ChatLine {
            speaker,
            text,
            at: Local::now(),
        });
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Length(3),
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(chunks[1]);
        self.render_conversation(frame, body[0]);
        self.render_countdown(frame, body[1]);

        self.render_footer(frame, chunks[2]);
        self.render_status(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let product = self.negotiation.product();
        let mut spans = vec![
            Span::styled(
                product.name.clone(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::raw(format!("Listed {}", product.format(product.base_price))),
            Span::raw("  "),
            Span::styled(
                format!(
                    "Round {}/{}",
                    self.negotiation.round().min(self.negotiation.total_rounds()),
                    self.negotiation.total_rounds()
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ];
        if let Some(status) = self.session_status {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                TimerSource::Session.message(status),
                Style::default().fg(self.theme.status_color(status)),
            ));
        }
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Bargain"));
        frame.render_widget(paragraph, area);
    }

    fn render_conversation(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let start = self.log.len().saturating_sub(visible);
        let lines: Vec<Line> = self.log[start..]
            .iter()
            .map(|line| {
                let color = match line.speaker {
                    Speaker::Agent => self.theme.accent,
                    Speaker::Supplier => self.theme.supplier,
                    Speaker::User => self.theme.primary_fg,
                };
                Line::from(vec![
                    Span::styled(
                        format!("{} ", line.at.format("%H:%M:%S")),
                        Style::default().fg(self.theme.muted),
                    ),
                    Span::styled(
                        format!("{}: ", line.speaker.label()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(line.text.clone()),
                ])
            })
            .collect();
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Conversation"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_countdown(&self, frame: &mut Frame, area: Rect) {
        let (title, status) = match (self.offer_status, self.hold_status) {
            (Some(status), _) if self.negotiation.offer_deadline().is_some() => ("Offer", Some(status)),
            (_, Some(status)) => ("Price hold", Some(status)),
            _ => ("Offer", None),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        let Some(status) = status else {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                "No offer on the table",
                Style::default().fg(self.theme.muted),
            )))
            .alignment(Alignment::Center)
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        };

        let style = Style::default().fg(self.theme.status_color(status));
        let clock = format_remaining(status.remaining());
        let digits = countdown_font::render(&clock);
        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = if countdown_font::width(&digits) <= inner_width
            && countdown_font::HEIGHT + 2 <= inner_height
        {
            digits
                .into_iter()
                .map(|row| Line::from(Span::styled(row, style)))
                .collect()
        } else {
            vec![Line::from(Span::styled(clock, style.add_modifier(Modifier::BOLD)))]
        };
        let label = match status {
            TimerStatus::Active(_) => "Active",
            TimerStatus::ExpiringSoon(_) => "Expiring soon",
            TimerStatus::Expired => "Expired",
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(label, style.add_modifier(Modifier::BOLD))));

        let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let product = self.negotiation.product();
        let key = |label: &str| {
            Span::styled(
                label.to_string(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let muted = Style::default().fg(self.theme.muted);
        let mut lines = Vec::new();

        if self.input.is_disabled() {
            let text = match self.negotiation.phase() {
                RoundPhase::SubmittingBid => "Checking your price with the supplier…",
                _ => "Negotiation finished",
            };
            lines.push(Line::from(Span::styled(text, muted)));
        } else {
            match self.input.mode() {
                InputMode::Reuse => {
                    let mut spans = Vec::new();
                    if let Some(price) = self.input.reuse_price() {
                        spans.push(key("[r]"));
                        spans.push(Span::raw(format!(" Send {} again   ", product.format(price))));
                    }
                    spans.push(key("[n]"));
                    spans.push(Span::raw(" Enter a new price"));
                    lines.push(Line::from(spans));
                }
                InputMode::New => {
                    let mut spans = vec![
                        Span::styled("> ", Style::default().fg(self.theme.accent)),
                        Span::raw(product.currency_symbol.clone()),
                        Span::raw(self.input.buffer().to_string()),
                        Span::styled("_", muted),
                        Span::raw("   "),
                        key("[Enter]"),
                        Span::raw(" send"),
                    ];
                    if let Some(price) = self.input.reuse_price() {
                        spans.push(Span::raw("   "));
                        spans.push(key("[r]"));
                        spans.push(Span::raw(format!(" reuse {}", product.format(price))));
                    }
                    lines.push(Line::from(spans));
                }
            }

            if self.input.can_accept_previous()
                && self.negotiation.phase() != RoundPhase::ReceivedCounter
            {
                let props = self.input.props();
                if let (Some(offer), Some(secs)) = (
                    props.last_offer.and_then(Price::from_amount),
                    props.last_offer_seconds_left,
                ) {
                    lines.push(Line::from(vec![
                        key("[a]"),
                        Span::raw(format!(
                            " Take previous offer {} ({} left)",
                            product.format(offer),
                            format_remaining(secs)
                        )),
                    ]));
                }
            }
        }

        if let Some(offer) = self.negotiation.counter_offer() {
            let mut spans = vec![
                key("[a]"),
                Span::raw(format!(" Accept {}   ", product.format(offer))),
                key("[d]"),
                Span::raw(" Decline"),
            ];
            if let (true, Some(safe)) = (
                self.negotiation.is_final_round(),
                self.negotiation.safe_deal(),
            ) {
                let marker = |choice: PriceChoice| {
                    if self.negotiation.selection() == Some(choice) {
                        "●"
                    } else {
                        "○"
                    }
                };
                spans.push(Span::raw("   "));
                spans.push(key("[s]"));
                spans.push(Span::raw(format!(
                    " {} Safe {}  ",
                    marker(PriceChoice::Safe),
                    product.format(safe)
                )));
                spans.push(key("[f]"));
                spans.push(Span::raw(format!(
                    " {} Final {}",
                    marker(PriceChoice::Final),
                    product.format(offer)
                )));
            }
            lines.push(Line::from(spans));
        }

        if let Some(floor) = self.config.suggestion_floor() {
            let suggestions = self.negotiation.suggestions(floor);
            if !suggestions.is_empty() && !self.input.is_disabled() {
                let listed = suggestions
                    .iter()
                    .map(|price| product.format(*price))
                    .collect::<Vec<_>>()
                    .join(" · ");
                lines.push(Line::from(vec![
                    key("[Tab]"),
                    Span::styled(format!(" Try {listed}"), muted),
                ]));
            }
        }

        if let Some(status) = self.hold_status {
            lines.push(Line::from(Span::styled(
                TimerSource::PriceHold.message(status),
                Style::default().fg(self.theme.status_color(status)),
            )));
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Your price"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let paragraph = Paragraph::new(Line::from(vec![
            Span::raw(self.status.clone()),
            Span::styled("   q quit", Style::default().fg(self.theme.muted)),
        ]))
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
