// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Home, product entry and gallery views. The camera overlay renders the
//! live feed with Unicode half-block characters for double vertical
//! resolution.

use crate::backends::camera::format_converters::{frame_to_rgb, yuv_to_rgb};
use crate::backends::camera::CameraBackend;
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::capture::{
    CaptureController, CaptureEvent, CaptureOptions, CaptureOutcome, CaptureState,
};
use crate::constants::file_formats::IMAGE_EXTENSIONS;
use crate::constants::terminal::POLL_INTERVAL;
use crate::entry::ProductForm;
use crate::gallery::{self, Gallery};
use crate::gateway::CatalogGateway;
use crate::shell::{Shell, View};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info};

/// What the terminal front end needs to run
pub struct TerminalContext<G> {
    /// Gateway, or the configuration problem that prevented building one
    pub gateway: Result<G, String>,
    pub backend: Arc<dyn CameraBackend>,
    pub capture: CaptureOptions,
}

/// Run the terminal front end until the operator quits
pub async fn run<G: CatalogGateway>(
    context: TerminalContext<G>,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = App::new(context).run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Focusable rows of the entry form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Sku,
    Serial,
    Name,
    Description,
    Photos,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Sku,
        FormField::Serial,
        FormField::Name,
        FormField::Description,
        FormField::Photos,
    ];

    fn step(self, forward: bool) -> Self {
        let len = Self::ORDER.len();
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward { (i + 1) % len } else { (i + len - 1) % len };
        Self::ORDER[next]
    }

    fn label(self) -> &'static str {
        match self {
            FormField::Sku => "Product SKU *",
            FormField::Serial => "Serial number *",
            FormField::Name => "Name",
            FormField::Description => "Description",
            FormField::Photos => "Photos",
        }
    }
}

struct CameraOverlay {
    controller: CaptureController,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
    preview: FrameWidget,
    closed: bool,
}

struct App<G> {
    gateway: Result<G, String>,
    backend: Arc<dyn CameraBackend>,
    capture_options: CaptureOptions,
    shell: Shell,
    form: ProductForm,
    field: FormField,
    gallery: Gallery,
    gallery_cursor: usize,
    photo_cursor: usize,
    searching: bool,
    camera: Option<CameraOverlay>,
    status: String,
    quit: bool,
}

impl<G: CatalogGateway> App<G> {
    fn new(context: TerminalContext<G>) -> Self {
        let status = match &context.gateway {
            Ok(_) => String::new(),
            Err(e) => format!("Catalog unavailable: {}", e),
        };
        Self {
            gateway: context.gateway,
            backend: context.backend,
            capture_options: context.capture,
            shell: Shell::new(),
            form: ProductForm::new(),
            field: FormField::Sku,
            gallery: Gallery::new(),
            gallery_cursor: 0,
            photo_cursor: 0,
            searching: false,
            camera: None,
            status,
            quit: false,
        }
    }

    async fn run(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        while !self.quit {
            self.drain_camera_events();
            if let Some(overlay) = self.camera.as_mut() {
                overlay.preview.update_frame(overlay.controller.preview_frame());
            }

            terminal.draw(|f| self.draw(f))?;

            if event::poll(POLL_INTERVAL)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key).await;
            }
        }

        if let Some(mut overlay) = self.camera.take() {
            overlay.controller.close();
        }
        Ok(())
    }

    // ===== Input =====

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if self.camera.is_some() {
            self.handle_camera_key(key).await;
            return;
        }

        match self.shell.view() {
            View::Home => self.handle_home_key(key).await,
            View::Log => self.handle_log_key(key).await,
            View::Gallery => self.handle_gallery_key(key).await,
        }
    }

    async fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('1') | KeyCode::Char('l') => self.show_log().await,
            KeyCode::Char('2') | KeyCode::Char('g') => self.show_gallery().await,
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            _ => {}
        }
    }

    async fn show_log(&mut self) {
        self.shell.navigate(View::Log);
        self.field = FormField::Sku;
        if self.form.skus().is_empty() {
            match &self.gateway {
                Ok(gateway) => {
                    if let Err(e) = self.form.load_skus(gateway).await {
                        self.status = e.to_string();
                    }
                }
                Err(e) => self.status = format!("Catalog unavailable: {}", e),
            }
        }
    }

    async fn show_gallery(&mut self) {
        self.shell.navigate(View::Gallery);
        self.refresh_gallery().await;
    }

    async fn refresh_gallery(&mut self) {
        match &self.gateway {
            Ok(gateway) => self.gallery.refresh(gateway).await,
            Err(e) => self.status = format!("Catalog unavailable: {}", e),
        }
        let count = self.gallery.filtered().len();
        self.gallery_cursor = self.gallery_cursor.min(count.saturating_sub(1));
    }

    async fn handle_log_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.shell.navigate(View::Home),
            KeyCode::Tab | KeyCode::Down => self.field = self.field.step(true),
            KeyCode::BackTab | KeyCode::Up => self.field = self.field.step(false),
            KeyCode::Enter => self.submit().await,
            KeyCode::Left | KeyCode::Right if self.field == FormField::Sku => {
                self.form.cycle_sku(key.code == KeyCode::Right);
            }
            KeyCode::Char(c) if self.field == FormField::Photos => match c {
                'c' => self.open_camera().await,
                'l' => self.pick_from_library().await,
                'd' => {
                    let last = self.form.photos().len().checked_sub(1);
                    if let Some(index) = last
                        && self.form.remove_photo(index).is_ok()
                    {
                        self.status = format!("Removed photo {}", index + 1);
                    }
                }
                _ => {}
            },
            KeyCode::Char(c) => {
                if let Some(text) = self.field_text_mut() {
                    text.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(text) = self.field_text_mut() {
                    text.pop();
                }
            }
            _ => {}
        }
    }

    fn field_text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Sku => Some(&mut self.form.sku),
            FormField::Serial => Some(&mut self.form.serial_number),
            FormField::Name => Some(&mut self.form.name),
            FormField::Description => Some(&mut self.form.description),
            FormField::Photos => None,
        }
    }

    async fn submit(&mut self) {
        let gateway = match &self.gateway {
            Ok(gateway) => gateway,
            Err(e) => {
                self.status = format!("Catalog unavailable: {}", e);
                return;
            }
        };

        match self.form.submit(gateway).await {
            Ok(report) => {
                let mut status = report.summary();
                for failure in &report.failed {
                    status.push_str(&format!(
                        " | photo {}: {}",
                        failure.index + 1,
                        failure.message
                    ));
                }
                self.status = status;

                let product_id = report.product.id;
                self.shell.product_created(report.product);
                self.field = FormField::Sku;
                self.gallery.set_search("");
                self.gallery.refresh(gateway).await;
                self.gallery.select(gateway, product_id).await;
                self.gallery_cursor = self
                    .gallery
                    .filtered()
                    .iter()
                    .position(|p| p.id == product_id)
                    .unwrap_or(0);
                self.photo_cursor = 0;
            }
            Err(e) => {
                error!(error = %e, "Submit failed");
                self.status = e.to_string();
            }
        }
    }

    async fn pick_from_library(&mut self) {
        let picked = tokio::task::spawn_blocking(|| {
            rfd::FileDialog::new()
                .set_title("Choose a product photo")
                .add_filter("Images", IMAGE_EXTENSIONS)
                .pick_file()
        })
        .await;

        let path: PathBuf = match picked {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(e) => {
                self.status = format!("File picker failed: {}", e);
                return;
            }
        };

        match self.form.add_from_file(path).await {
            Ok(()) => self.status = format!("Photo {} added", self.form.photos().len()),
            Err(e) => self.status = e.to_string(),
        }
    }

    async fn handle_gallery_key(&mut self, key: KeyEvent) {
        if self.searching {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.searching = false,
                KeyCode::Backspace => {
                    let mut term = self.gallery.search().to_string();
                    term.pop();
                    self.gallery.set_search(term);
                    self.gallery_cursor = 0;
                }
                KeyCode::Char(c) => {
                    let term = format!("{}{}", self.gallery.search(), c);
                    self.gallery.set_search(term);
                    self.gallery_cursor = 0;
                }
                _ => {}
            }
            return;
        }

        let count = self.gallery.filtered().len();
        match key.code {
            KeyCode::Esc if self.gallery.selected_id().is_some() => self.gallery.clear_selection(),
            KeyCode::Esc | KeyCode::Char('q') => self.shell.navigate(View::Home),
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('r') => self.refresh_gallery().await,
            KeyCode::Up => self.gallery_cursor = self.gallery_cursor.saturating_sub(1),
            KeyCode::Down if self.gallery_cursor + 1 < count => self.gallery_cursor += 1,
            KeyCode::Left => self.photo_cursor = self.photo_cursor.saturating_sub(1),
            KeyCode::Right if self.photo_cursor + 1 < self.gallery.photos().len() => {
                self.photo_cursor += 1
            }
            KeyCode::Enter => {
                let id = self.gallery.filtered().get(self.gallery_cursor).map(|p| p.id);
                if let (Some(id), Ok(gateway)) = (id, &self.gateway) {
                    self.gallery.select(gateway, id).await;
                    self.photo_cursor = 0;
                }
            }
            KeyCode::Char('o') => {
                if let Some(photo) = self.gallery.photos().get(self.photo_cursor) {
                    match gallery::open_photo(photo) {
                        Ok(()) => self.status = format!("Opened {}", photo.photo_name),
                        Err(e) => self.status = e.to_string(),
                    }
                }
            }
            KeyCode::Char('n') => self.show_log().await,
            _ => {}
        }
    }

    // ===== Camera overlay =====

    async fn open_camera(&mut self) {
        let (controller, events) =
            CaptureController::new(Arc::clone(&self.backend), self.capture_options.clone());
        let mut overlay = CameraOverlay {
            controller,
            events,
            preview: FrameWidget::new(),
            closed: false,
        };
        overlay.controller.open().await;
        self.camera = Some(overlay);
        self.drain_camera_events();
    }

    async fn handle_camera_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.camera.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => {
                overlay.controller.close();
                self.status = "Camera cancelled".to_string();
            }
            KeyCode::Char(' ') | KeyCode::Enter => match overlay.controller.capture().await {
                CaptureOutcome::NotReady => self.status = "Camera loading...".to_string(),
                CaptureOutcome::Captured { width, height } => {
                    info!(width, height, "Photo captured");
                }
                CaptureOutcome::Failed(e) => self.status = e.to_string(),
            },
            KeyCode::Char('r') => overlay.controller.retry().await,
            _ => {}
        }

        self.drain_camera_events();
    }

    fn drain_camera_events(&mut self) {
        let Some(overlay) = self.camera.as_mut() else {
            return;
        };

        let mut events = Vec::new();
        while let Ok(event) = overlay.events.try_recv() {
            events.push(event);
        }

        for event in events {
            match event {
                CaptureEvent::ImageReady(image) => {
                    self.form.add_captured(image);
                    self.status = format!("Photo {} added", self.form.photos().len());
                }
                CaptureEvent::CaptureFailed(message) => self.status = message,
                CaptureEvent::Closed => overlay.closed = true,
                CaptureEvent::Streaming { .. }
                | CaptureEvent::Ready(_)
                | CaptureEvent::Error(_) => {}
            }
        }

        if overlay.closed {
            self.camera = None;
        }
    }

    // ===== Rendering =====

    fn draw(&self, f: &mut Frame) {
        let [header, body, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(f.area());

        let title = format!(" QA Camera | {} ", self.shell.view().title());
        f.render_widget(
            Paragraph::new(title).style(Style::new().add_modifier(Modifier::BOLD)),
            header,
        );

        match self.shell.view() {
            View::Home => self.draw_home(f, body),
            View::Log => self.draw_log(f, body),
            View::Gallery => self.draw_gallery(f, body),
        }

        if let Some(overlay) = &self.camera {
            draw_camera(f, body, overlay);
        }

        let hints = self.key_hints();
        let message = if self.status.is_empty() {
            hints
        } else {
            self.status.as_str()
        };
        f.render_widget(StatusBar { message }, status_area);
    }

    fn key_hints(&self) -> &'static str {
        if let Some(overlay) = &self.camera {
            return match overlay.controller.state() {
                CaptureState::Error(_) => "r: retry | Esc: cancel",
                _ => "Space: capture | Esc: cancel",
            };
        }
        match self.shell.view() {
            View::Home => "1: log product | 2: gallery | q: quit",
            View::Log if self.field == FormField::Photos => {
                "c: camera | l: library | d: remove last | Enter: save | Esc: back"
            }
            View::Log => "Tab: next field | ←/→: pick SKU | Enter: save | Esc: back",
            View::Gallery if self.searching => "Type to filter | Enter: done",
            View::Gallery => concat!(
                "/: search | ↑/↓: product | Enter: photos | ←/→: photo | ",
                "o: open | r: refresh | Esc: back"
            ),
        }
    }

    fn draw_home(&self, f: &mut Frame, area: Rect) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Furniture QA photo catalog",
                Style::new().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("  1  Log a product"),
            Line::from("  2  Browse gallery"),
            Line::from(""),
            Line::from(Span::styled(
                "Recently logged",
                Style::new().add_modifier(Modifier::UNDERLINED),
            )),
        ];

        if self.shell.recent().is_empty() {
            lines.push(Line::from(Span::styled(
                "  Nothing logged in this session",
                Style::new().fg(Color::DarkGray),
            )));
        }
        for product in self.shell.recent().iter() {
            lines.push(Line::from(format!(
                "  {}  {}  {}  {}",
                product.sku,
                product.serial_number,
                product.title(),
                product.created_at.with_timezone(&chrono::Local).format("%H:%M")
            )));
        }

        f.render_widget(Paragraph::new(lines).block(Block::bordered()), area);
    }

    fn draw_log(&self, f: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        for field in FormField::ORDER {
            let focused = field == self.field;
            let marker = if focused { "> " } else { "  " };
            let label_style = if focused {
                Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::new()
            };

            let value = match field {
                FormField::Sku => self.form.sku.as_str(),
                FormField::Serial => self.form.serial_number.as_str(),
                FormField::Name => self.form.name.as_str(),
                FormField::Description => self.form.description.as_str(),
                FormField::Photos => "",
            };
            let cursor = if focused && field != FormField::Photos {
                "▏"
            } else {
                ""
            };

            let mut spans = vec![
                Span::styled(format!("{}{:<16}", marker, field.label()), label_style),
                Span::raw(format!("{}{}", value, cursor)),
            ];

            if field == FormField::Sku {
                let hint = match self.form.sku_error() {
                    Some(e) => Span::styled(format!("  {}", e), Style::new().fg(Color::Red)),
                    None => Span::styled(
                        format!("  ({} options)", self.form.skus().len()),
                        Style::new().fg(Color::DarkGray),
                    ),
                };
                spans.push(hint);
            }
            if field == FormField::Photos {
                spans.push(Span::raw(format!("{} pending", self.form.photos().len())));
            }
            lines.push(Line::from(spans));
        }

        for (i, photo) in self.form.photos().iter().enumerate() {
            lines.push(Line::from(format!("      {}. {}", i + 1, photo.label())));
        }

        f.render_widget(
            Paragraph::new(lines)
                .block(Block::bordered().title(" New product "))
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_gallery(&self, f: &mut Frame, area: Rect) {
        let [search_area, lists] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
        let [products_area, photos_area] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(lists);

        let cursor = if self.searching { "▏" } else { "" };
        f.render_widget(
            Paragraph::new(format!(" Search: {}{}", self.gallery.search(), cursor)),
            search_area,
        );

        let highlight = Style::new().add_modifier(Modifier::REVERSED);
        let selected = self.gallery.selected_id();

        let mut product_lines: Vec<Line> = Vec::new();
        if let Some(e) = self.gallery.error() {
            product_lines.push(Line::from(Span::styled(
                e.to_string(),
                Style::new().fg(Color::Red),
            )));
        }
        let filtered = self.gallery.filtered();
        if filtered.is_empty() {
            product_lines.push(Line::from(Span::styled(
                "No products",
                Style::new().fg(Color::DarkGray),
            )));
        }
        for (i, product) in filtered.iter().enumerate() {
            let marker = if Some(product.id) == selected { "*" } else { " " };
            let text = format!(
                "{} {:<12} {:<14} {}",
                marker,
                product.sku,
                product.serial_number,
                product.title()
            );
            let style = if i == self.gallery_cursor {
                highlight
            } else {
                Style::new()
            };
            product_lines.push(Line::from(Span::styled(text, style)));
        }
        f.render_widget(
            Paragraph::new(product_lines).block(Block::bordered().title(" Products ")),
            products_area,
        );

        let mut photo_lines: Vec<Line> = Vec::new();
        match self.gallery.selected() {
            None => photo_lines.push(Line::from(Span::styled(
                "Select a product to see its photos",
                Style::new().fg(Color::DarkGray),
            ))),
            Some(product) => {
                if let Some(description) = &product.description {
                    photo_lines.push(Line::from(description.as_str()));
                }
                if self.gallery.photos().is_empty() {
                    photo_lines.push(Line::from(Span::styled(
                        "No photos",
                        Style::new().fg(Color::DarkGray),
                    )));
                }
                for (i, photo) in self.gallery.photos().iter().enumerate() {
                    let text = format!(
                        "{}  {}",
                        photo.taken_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                        photo.photo_name
                    );
                    let style = if i == self.photo_cursor {
                        highlight
                    } else {
                        Style::new()
                    };
                    photo_lines.push(Line::from(Span::styled(text, style)));
                }
            }
        }
        f.render_widget(
            Paragraph::new(photo_lines).block(Block::bordered().title(" Photos ")),
            photos_area,
        );
    }
}

fn draw_camera(f: &mut Frame, area: Rect, overlay: &CameraOverlay) {
    let block = Block::bordered().title(" Camera ");
    let inner = block.inner(area);
    f.render_widget(Clear, area);
    f.render_widget(block, area);

    let message = match overlay.controller.state() {
        CaptureState::Error(reason) => Some(reason.user_message()),
        CaptureState::Streaming { ready: true } | CaptureState::Capturing => None,
        CaptureState::Closed => Some("Camera closed"),
        _ => Some("Camera loading..."),
    };

    if !matches!(overlay.controller.state(), CaptureState::Error(_)) {
        f.render_widget(&overlay.preview, inner);
    }

    if let Some(message) = message {
        let y = inner.y + inner.height / 2;
        let line = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: 1.min(inner.height),
        };
        f.render_widget(
            Paragraph::new(message)
                .centered()
                .style(Style::new().fg(Color::White).bg(Color::DarkGray)),
            line,
        );
    }
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<CameraFrame>,
    captured_at: Option<Instant>,
}

impl FrameWidget {
    fn new() -> Self {
        Self {
            frame: None,
            captured_at: None,
        }
    }

    /// Take the latest frame; MJPEG frames are decoded once here
    fn update_frame(&mut self, frame: Option<CameraFrame>) {
        let Some(frame) = frame.filter(CameraFrame::is_decodable) else {
            return;
        };
        if self.captured_at == Some(frame.captured_at) {
            return;
        }
        self.captured_at = Some(frame.captured_at);

        if frame.format != PixelFormat::MJPEG {
            self.frame = Some(frame);
            return;
        }

        match frame_to_rgb(&frame) {
            Ok(rgb) => {
                let (width, height) = rgb.dimensions();
                self.frame = Some(CameraFrame {
                    width,
                    height,
                    data: Arc::from(rgb.into_raw()),
                    format: PixelFormat::RGB24,
                    stride: width * 3,
                    captured_at: frame.captured_at,
                });
            }
            Err(e) => tracing::debug!(error = %e, "Skipping undecodable preview frame"),
        }
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell shows two vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes the fg colour, lower half the bg colour
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let top_color = sample_pixel(frame, src_x, src_y_top);
                let bottom_color = sample_pixel(frame, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = sample_pixel_rgb(frame, x, y);
    Color::Rgb(r, g, b)
}

fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width.saturating_sub(1));
    let y = y.min(frame.height.saturating_sub(1));
    let data = &frame.data[..];

    match frame.format {
        PixelFormat::RGBA | PixelFormat::RGB24 => {
            let bpp = if frame.format == PixelFormat::RGBA { 4 } else { 3 };
            let idx = (y * frame.stride + x * bpp) as usize;
            if idx + 2 < data.len() {
                (data[idx], data[idx + 1], data[idx + 2])
            } else {
                (0, 0, 0)
            }
        }
        PixelFormat::Gray8 => {
            let idx = (y * frame.stride + x) as usize;
            match data.get(idx) {
                Some(&v) => (v, v, v),
                None => (0, 0, 0),
            }
        }
        PixelFormat::YUYV | PixelFormat::UYVY => {
            // Two pixels share chroma: YUYV is Y0 U Y1 V, UYVY is U Y0 V Y1
            let pair_x = (x & !1) as usize;
            let base = (y as usize) * (frame.stride as usize) + pair_x * 2;
            if base + 3 >= data.len() {
                return (0, 0, 0);
            }
            let (luma, u, v) = if frame.format == PixelFormat::YUYV {
                let luma = if x & 1 == 0 { data[base] } else { data[base + 2] };
                (luma, data[base + 1], data[base + 3])
            } else {
                let luma = if x & 1 == 0 { data[base + 1] } else { data[base + 3] };
                (luma, data[base], data[base + 2])
            };
            yuv_to_rgb(luma, u, v)
        }
        // Decoded in update_frame
        PixelFormat::MJPEG => (0, 0, 0),
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: u32,
        data: Vec<u8>,
    ) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format,
            stride,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_sample_rgb24_and_gray() {
        let rgb = frame(PixelFormat::RGB24, 2, 1, 6, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(sample_pixel_rgb(&rgb, 1, 0), (40, 50, 60));
        // Out-of-range coordinates clamp to the last pixel
        assert_eq!(sample_pixel_rgb(&rgb, 9, 9), (40, 50, 60));

        let gray = frame(PixelFormat::Gray8, 2, 1, 2, vec![7, 200]);
        assert_eq!(sample_pixel_rgb(&gray, 1, 0), (200, 200, 200));
    }

    #[test]
    fn test_sample_yuyv_neutral_chroma_is_gray() {
        let yuyv = frame(PixelFormat::YUYV, 2, 1, 4, vec![100, 128, 150, 128]);
        assert_eq!(sample_pixel_rgb(&yuyv, 0, 0), (100, 100, 100));
        assert_eq!(sample_pixel_rgb(&yuyv, 1, 0), (150, 150, 150));
    }

    #[test]
    fn test_form_field_cycle() {
        assert_eq!(FormField::Sku.step(false), FormField::Photos);
        assert_eq!(FormField::Photos.step(true), FormField::Sku);
        assert_eq!(FormField::Serial.step(true), FormField::Name);
    }

    #[test]
    fn test_frame_widget_renders_half_blocks() {
        let mut widget = FrameWidget::new();
        widget.update_frame(Some(frame(
            PixelFormat::RGB24,
            1,
            2,
            3,
            vec![255, 0, 0, 0, 0, 255],
        )));

        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }
}
