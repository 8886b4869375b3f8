use std::panic::{self, AssertUnwindSafe};

use egui::{Color32, Frame, Layout, Margin, RichText, Ui, Visuals, style::Widgets};
use log::{error, info};

use tridash::auth::{LogoutReason, LogoutSubscription};
use tridash::config::AppConfig;
use tridash::i18n::{Locale, Text};
use tridash::model::{Account, Session};
use tridash::{ApiClient, TridashError};

mod admin_view;
mod data_view;
mod export_view;
mod feedback_view;
mod login;
mod plot;
mod worker;

use admin_view::{CompetitionsView, UsersView};
use data_view::DataView;
use export_view::ExportView;
use feedback_view::FeedbackView;
use login::LoginView;
use worker::Worker;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(14, 17, 22);
pub(crate) const PALETTE_NAVY: Color32 = Color32::from_rgb(24, 38, 58);
pub(crate) const PALETTE_TEAL: Color32 = Color32::from_rgb(38, 139, 150);
pub(crate) const PALETTE_ORANGE: Color32 = Color32::from_rgb(242, 140, 63);

/// Borrowed services every view needs while it draws.
pub(crate) struct ViewContext<'a> {
    pub(crate) worker: &'a Worker,
    pub(crate) client: &'a ApiClient,
    pub(crate) config: &'a AppConfig,
}

impl ViewContext<'_> {
    pub(crate) fn locale(&self) -> Locale {
        self.config.locale
    }

    pub(crate) fn text(&self, key: Text) -> &'static str {
        self.config.locale.text(key)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tab {
    SensorData,
    Feedback,
    Users,
    Competitions,
    Export,
}

impl Tab {
    fn label(self) -> Text {
        match self {
            Tab::SensorData => Text::SensorData,
            Tab::Feedback => Text::Feedback,
            Tab::Users => Text::Users,
            Tab::Competitions => Text::Competitions,
            Tab::Export => Text::Export,
        }
    }

    fn available_for(account: &Account) -> &'static [Tab] {
        match account {
            Account::Admin(_) => &[Tab::Users, Tab::SensorData, Tab::Competitions, Tab::Export],
            Account::User(_) => &[Tab::SensorData, Tab::Feedback, Tab::Export],
        }
    }
}

/// Inline error with an optional retry button. Returns true when retry was clicked.
pub(crate) fn error_banner(ui: &mut Ui, error: &TridashError, locale: Locale) -> bool {
    let mut retry = false;
    ui.horizontal(|ui| {
        ui.label(RichText::new(error.user_message(locale)).color(Color32::LIGHT_RED));
        if error.is_retryable() && ui.button(locale.text(Text::Retry)).clicked() {
            retry = true;
        }
    });
    retry
}

pub(crate) fn reading_cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

pub(crate) struct DashboardApp {
    config: AppConfig,
    client: ApiClient,
    worker: Worker,
    logout: LogoutSubscription,
    account: Option<Account>,
    tab: Tab,
    login: LoginView,
    data: DataView,
    feedback: FeedbackView,
    users: UsersView,
    competitions: CompetitionsView,
    export: ExportView,
    crash: Option<String>,
}

impl DashboardApp {
    pub(crate) fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        client: ApiClient,
    ) -> Result<Self, TridashError> {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        let default_visuals = Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_TEAL,
            faint_bg_color: PALETTE_NAVY,
            extreme_bg_color: PALETTE_BLACK,
            panel_fill: PALETTE_BLACK,
            window_fill: PALETTE_NAVY,
            selection: egui::style::Selection {
                bg_fill: PALETTE_TEAL,
                ..Default::default()
            },
            widgets: Widgets::dark(),
            striped: true,
            ..Default::default()
        };
        cc.egui_ctx.set_visuals(default_visuals);

        let worker = Worker::new(cc.egui_ctx.clone())?;
        let logout = client.auth().subscribe_logout();
        let account = client.auth().account();

        let mut app = Self {
            login: LoginView::new(),
            data: DataView::new(config.page_size),
            feedback: FeedbackView::new(config.default_offset_minutes),
            users: UsersView::new(),
            competitions: CompetitionsView::new(),
            export: ExportView::new(),
            config,
            client,
            worker,
            logout,
            account: None,
            tab: Tab::SensorData,
            crash: None,
        };
        if let Some(account) = account {
            info!("Restored session for {}", account.username());
            app.enter_dashboard(account);
        }
        Ok(app)
    }

    fn enter_dashboard(&mut self, account: Account) {
        self.tab = Tab::available_for(&account)[0];
        self.account = Some(account);
    }

    fn reset_views(&mut self) {
        self.data = DataView::new(self.config.page_size);
        self.feedback = FeedbackView::new(self.config.default_offset_minutes);
        self.users = UsersView::new();
        self.competitions = CompetitionsView::new();
        self.export = ExportView::new();
    }

    fn handle_logout(&mut self) {
        while let Some(reason) = self.logout.try_next() {
            info!("Returning to login screen ({:?})", reason);
            self.account = None;
            self.reset_views();
            if reason == LogoutReason::Unauthorized {
                self.login.set_error(TridashError::Unauthorized);
            }
        }
    }

    fn show_login(&mut self, ctx: &egui::Context) {
        let view = ViewContext {
            worker: &self.worker,
            client: &self.client,
            config: &self.config,
        };
        let mut session: Option<Session> = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            session = self.login.show(ui, &view);
        });
        if let Some(session) = session {
            self.enter_dashboard(session.account);
        }
    }

    fn show_dashboard(&mut self, ctx: &egui::Context, account: Account) {
        egui::TopBottomPanel::top("navigation")
            .frame(Frame::default().fill(PALETTE_NAVY).inner_margin(Margin::same(6)))
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(egui::Align::Center), |ui| {
                    ui.label(RichText::new("Tridash").color(PALETTE_ORANGE).strong());
                    ui.separator();
                    for tab in Tab::available_for(&account) {
                        ui.selectable_value(&mut self.tab, *tab, self.config.locale.text(tab.label()));
                    }
                    ui.with_layout(Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(self.config.locale.text(Text::Logout)).clicked() {
                            self.client.logout();
                        }
                        ui.label(RichText::new(account.username()).color(Color32::WHITE));
                        egui::ComboBox::from_id_salt("locale")
                            .selected_text(match self.config.locale {
                                Locale::English => "English",
                                Locale::Japanese => "日本語",
                            })
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut self.config.locale, Locale::English, "English");
                                ui.selectable_value(&mut self.config.locale, Locale::Japanese, "日本語");
                            });
                    });
                });
            });

        let view = ViewContext {
            worker: &self.worker,
            client: &self.client,
            config: &self.config,
        };
        egui::CentralPanel::default()
            .frame(Frame::default().fill(PALETTE_BLACK).inner_margin(Margin::same(8)))
            .show(ctx, |ui| match self.tab {
                Tab::SensorData => self.data.show(ui, &view, &account),
                Tab::Feedback => self.feedback.show(ui, &view),
                Tab::Users => self.users.show(ui, &view),
                Tab::Competitions => self.competitions.show(ui, &view),
                Tab::Export => self.export.show(ui, &view, &self.data),
            });
    }

    fn show_frame(&mut self, ctx: &egui::Context) {
        self.handle_logout();
        match self.account.clone() {
            None => self.show_login(ctx),
            Some(account) => self.show_dashboard(ctx, account),
        }
    }

    /// Shown after a panic while drawing, offering to start over or to keep going.
    fn show_crash(&mut self, ctx: &egui::Context, message: String) {
        let locale = self.config.locale;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(80.);
                ui.heading(RichText::new(locale.text(Text::SomethingWentWrong)).color(Color32::LIGHT_RED));
                ui.label(RichText::new(message).small());
                ui.add_space(20.);
                ui.horizontal(|ui| {
                    if ui.button(locale.text(Text::Reload)).clicked() {
                        self.reset_views();
                        self.crash = None;
                    }
                    if ui.button(locale.text(Text::Dismiss)).clicked() {
                        self.crash = None;
                    }
                });
            });
        });
    }
}

impl eframe::App for DashboardApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(message) = self.crash.clone() {
            self.show_crash(ctx, message);
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.show_frame(ctx)));
        if let Err(payload) = result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown error".to_string());
            error!("Recovered from a panic while drawing: {}", message);
            self.crash = Some(message);
            ctx.request_repaint();
        }
    }
}
