use egui::{Color32, RichText, TextEdit, Ui};

use tridash::TridashError;
use tridash::i18n::Text;
use tridash::model::Session;

use super::worker::Fetch;
use super::{PALETTE_ORANGE, ViewContext, error_banner};

pub(crate) struct LoginView {
    username: String,
    password: String,
    fetch: Fetch<Session>,
    error: Option<TridashError>,
}

impl LoginView {
    pub(crate) fn new() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            fetch: Fetch::new("login"),
            error: None,
        }
    }

    pub(crate) fn set_error(&mut self, error: TridashError) {
        self.error = Some(error);
    }

    fn submit(&mut self, view: &ViewContext) {
        if self.username.trim().is_empty() || self.password.is_empty() {
            self.error = Some(TridashError::InvalidUserInput {
                field: view.text(Text::Username).to_string(),
                reason: "username and password are required".to_string(),
            });
            return;
        }
        self.error = None;
        let client = view.client.clone();
        let username = self.username.trim().to_string();
        let password = self.password.clone();
        self.fetch.start(view.worker, async move {
            client.login(&username, &password).await
        });
    }

    /// Returns the new session once a login succeeds.
    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext) -> Option<Session> {
        if let Some(result) = self.fetch.poll() {
            match result {
                Ok(session) => {
                    self.password.clear();
                    self.error = None;
                    return Some(session);
                }
                Err(e) => self.error = Some(e),
            }
        }

        ui.vertical_centered(|ui| {
            ui.add_space(120.);
            ui.heading(RichText::new("Tridash").color(PALETTE_ORANGE).strong());
            ui.add_space(20.);
            ui.label(RichText::new(view.text(Text::Username)).color(Color32::WHITE));
            ui.add(TextEdit::singleline(&mut self.username).desired_width(240.));
            ui.label(RichText::new(view.text(Text::Password)).color(Color32::WHITE));
            let password = ui.add(
                TextEdit::singleline(&mut self.password)
                    .password(true)
                    .desired_width(240.),
            );
            let submitted_with_enter =
                password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(10.);

            let loading = self.fetch.is_loading();
            let clicked = ui
                .add_enabled(!loading, egui::Button::new(view.text(Text::Login)))
                .clicked();
            if loading {
                ui.spinner();
            }
            if (clicked || submitted_with_enter) && !loading {
                self.submit(view);
            }

            let retry = self
                .error
                .as_ref()
                .is_some_and(|error| error_banner(ui, error, view.locale()));
            if retry {
                self.submit(view);
            }
        });
        None
    }
}
