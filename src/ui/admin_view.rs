use std::fs;
use std::path::PathBuf;

use egui::{Color32, RichText, TextEdit, Ui};
use egui_extras::{Column, TableBuilder};
use log::info;

use tridash::TridashError;
use tridash::i18n::Text;
use tridash::import::{ImportPreview, preview_users_csv};
use tridash::model::{CompetitionDraft, CompetitionRace, ManagedUser, UserImportResult};
use tridash::timestamp::parse_date;

use super::worker::Fetch;
use super::{ViewContext, error_banner};

/// A CSV picked for import, checked locally before upload.
struct PendingImport {
    path: PathBuf,
    bytes: Vec<u8>,
    preview: ImportPreview,
}

pub(crate) struct UsersView {
    users: Vec<ManagedUser>,
    users_fetch: Fetch<Vec<ManagedUser>>,
    requested: bool,
    pending: Option<PendingImport>,
    import_fetch: Fetch<UserImportResult>,
    import_result: Option<UserImportResult>,
    error: Option<TridashError>,
}

impl UsersView {
    pub(crate) fn new() -> Self {
        Self {
            users: Vec::new(),
            users_fetch: Fetch::new("users"),
            requested: false,
            pending: None,
            import_fetch: Fetch::new("user_import"),
            import_result: None,
            error: None,
        }
    }

    fn refresh(&mut self, view: &ViewContext) {
        let client = view.client.clone();
        self.users_fetch
            .start(view.worker, async move { client.users().await });
        self.requested = true;
    }

    fn pick_csv(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV", &["csv"])
            .pick_file()
        else {
            return;
        };
        let loaded = fs::read(&path)
            .map_err(|e| TridashError::CsvImportError { source: e.into() })
            .and_then(|bytes| preview_users_csv(&bytes).map(|preview| (bytes, preview)));
        match loaded {
            Ok((bytes, preview)) => {
                info!(
                    "Previewed {}: {} rows, {} problems",
                    path.display(),
                    preview.rows.len(),
                    preview.problems.len()
                );
                self.pending = Some(PendingImport {
                    path,
                    bytes,
                    preview,
                });
                self.import_result = None;
                self.error = None;
            }
            Err(e) => {
                self.pending = None;
                self.error = Some(e);
            }
        }
    }

    fn upload(&mut self, view: &ViewContext) {
        let Some(pending) = &self.pending else {
            return;
        };
        let file_name = pending
            .path
            .file_name()
            .map_or_else(|| "users.csv".to_string(), |n| n.to_string_lossy().into_owned());
        let bytes = pending.bytes.clone();
        let client = view.client.clone();
        self.import_fetch.start(view.worker, async move {
            client.import_users(&file_name, bytes).await
        });
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext) {
        if !self.requested {
            self.refresh(view);
        }
        if let Some(result) = self.users_fetch.poll() {
            match result {
                Ok(users) => self.users = users,
                Err(e) => self.error = Some(e),
            }
        }
        if let Some(result) = self.import_fetch.poll() {
            match result {
                Ok(result) => {
                    info!("Imported {} users, skipped {}", result.created, result.skipped);
                    self.import_result = Some(result);
                    self.pending = None;
                    self.refresh(view);
                }
                Err(e) => self.error = Some(e),
            }
        }

        ui.heading(view.text(Text::ImportUsers));
        ui.horizontal(|ui| {
            if ui.button(view.text(Text::ChooseFile)).clicked() {
                self.pick_csv();
            }
            let uploadable = self
                .pending
                .as_ref()
                .is_some_and(|p| p.preview.is_uploadable());
            let loading = self.import_fetch.is_loading();
            if ui
                .add_enabled(uploadable && !loading, egui::Button::new(view.text(Text::Upload)))
                .clicked()
            {
                self.upload(view);
            }
            if loading {
                ui.spinner();
            }
        });
        if let Some(pending) = &self.pending {
            ui.label(format!(
                "{}: {} rows",
                pending.path.display(),
                pending.preview.rows.len()
            ));
            if !pending.preview.unknown_columns.is_empty() {
                ui.label(
                    RichText::new(format!(
                        "Ignored columns: {}",
                        pending.preview.unknown_columns.join(", ")
                    ))
                    .weak(),
                );
            }
            for problem in &pending.preview.problems {
                ui.label(
                    RichText::new(format!("line {}: {}", problem.line, problem.reason))
                        .color(Color32::LIGHT_RED),
                );
            }
        }
        if let Some(result) = &self.import_result {
            ui.label(format!(
                "Created {}, skipped {}",
                result.created, result.skipped
            ));
            for error in &result.errors {
                ui.label(RichText::new(error).color(Color32::LIGHT_RED));
            }
        }

        let retry = self
            .error
            .as_ref()
            .is_some_and(|error| error_banner(ui, error, view.locale()));
        if retry {
            self.error = None;
            self.refresh(view);
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.heading(view.text(Text::Users));
            if ui.button(view.text(Text::Refresh)).clicked() {
                self.refresh(view);
            }
            if self.users_fetch.is_loading() {
                ui.spinner();
            }
        });
        TableBuilder::new(ui)
            .striped(true)
            .columns(Column::auto().at_least(120.), 4)
            .column(Column::remainder())
            .header(20., |mut header| {
                for title in [
                    view.text(Text::Username),
                    view.text(Text::Name),
                    "Email",
                    view.text(Text::SensorId),
                    "",
                ] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(18., self.users.len(), |mut row| {
                    let user = &self.users[row.index()];
                    for cell in [
                        Some(user.username.as_str()),
                        user.full_name.as_deref(),
                        user.email.as_deref(),
                        user.sensor_id.as_deref(),
                    ] {
                        row.col(|ui| {
                            ui.label(cell.unwrap_or("-"));
                        });
                    }
                    row.col(|ui| {
                        if !user.is_active {
                            ui.label(RichText::new("inactive").weak());
                        }
                    });
                });
            });
    }
}

/// Competition form contents. `editing` holds the id when updating an existing competition.
#[derive(Default)]
struct CompetitionForm {
    editing: Option<String>,
    name: String,
    date: String,
    location: String,
    description: String,
}

impl CompetitionForm {
    fn edit(competition: &CompetitionRace) -> Self {
        Self {
            editing: Some(competition.id.clone()),
            name: competition.name.clone(),
            date: competition.date.to_string(),
            location: competition.location.clone().unwrap_or_default(),
            description: competition.description.clone().unwrap_or_default(),
        }
    }

    fn draft(&self) -> Result<CompetitionDraft, TridashError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TridashError::InvalidUserInput {
                field: "name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let date = parse_date(&self.date).ok_or_else(|| TridashError::InvalidUserInput {
            field: "date".to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        })?;
        let optional = |raw: &str| {
            let raw = raw.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        };
        Ok(CompetitionDraft {
            name: name.to_string(),
            date,
            location: optional(&self.location),
            description: optional(&self.description),
        })
    }
}

pub(crate) struct CompetitionsView {
    competitions: Vec<CompetitionRace>,
    list_fetch: Fetch<Vec<CompetitionRace>>,
    requested: bool,
    form: CompetitionForm,
    mutation: Fetch<()>,
    error: Option<TridashError>,
}

impl CompetitionsView {
    pub(crate) fn new() -> Self {
        Self {
            competitions: Vec::new(),
            list_fetch: Fetch::new("competitions"),
            requested: false,
            form: CompetitionForm::default(),
            mutation: Fetch::new("competition_mutation"),
            error: None,
        }
    }

    fn refresh(&mut self, view: &ViewContext) {
        let client = view.client.clone();
        self.list_fetch
            .start(view.worker, async move { client.competitions().await });
        self.requested = true;
    }

    fn save(&mut self, view: &ViewContext) {
        let draft = match self.form.draft() {
            Ok(draft) => draft,
            Err(e) => {
                self.error = Some(e);
                return;
            }
        };
        let client = view.client.clone();
        let editing = self.form.editing.clone();
        self.mutation.start(view.worker, async move {
            match editing {
                Some(id) => client.update_competition(&id, &draft).await.map(|_| ()),
                None => client.create_competition(&draft).await.map(|_| ()),
            }
        });
    }

    fn delete(&mut self, view: &ViewContext, id: String) {
        let client = view.client.clone();
        self.mutation.start(view.worker, async move {
            client.delete_competition(&id).await
        });
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext) {
        if !self.requested {
            self.refresh(view);
        }
        if let Some(result) = self.list_fetch.poll() {
            match result {
                Ok(competitions) => self.competitions = competitions,
                Err(e) => self.error = Some(e),
            }
        }
        if let Some(result) = self.mutation.poll() {
            match result {
                Ok(()) => {
                    self.form = CompetitionForm::default();
                    self.error = None;
                    self.refresh(view);
                }
                Err(e) => self.error = Some(e),
            }
        }

        let busy = self.mutation.is_loading();
        egui::Grid::new("competition_form")
            .num_columns(2)
            .spacing([12., 6.])
            .show(ui, |ui| {
                ui.label(view.text(Text::Name));
                ui.add(TextEdit::singleline(&mut self.form.name).desired_width(260.));
                ui.end_row();
                ui.label(view.text(Text::Date));
                ui.add(
                    TextEdit::singleline(&mut self.form.date)
                        .hint_text("YYYY-MM-DD")
                        .desired_width(260.),
                );
                ui.end_row();
                ui.label(view.text(Text::Location));
                ui.add(TextEdit::singleline(&mut self.form.location).desired_width(260.));
                ui.end_row();
                ui.label(view.text(Text::Description));
                ui.add(TextEdit::multiline(&mut self.form.description).desired_width(260.));
                ui.end_row();
            });
        ui.horizontal(|ui| {
            let label = match self.form.editing {
                Some(_) => view.text(Text::Update),
                None => view.text(Text::Create),
            };
            if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                self.save(view);
            }
            if self.form.editing.is_some() && ui.button(view.text(Text::Cancel)).clicked() {
                self.form = CompetitionForm::default();
            }
            if busy {
                ui.spinner();
            }
        });

        let retry = self
            .error
            .as_ref()
            .is_some_and(|error| error_banner(ui, error, view.locale()));
        if retry {
            self.error = None;
            self.refresh(view);
        }

        ui.separator();
        let mut edit = None;
        let mut delete = None;
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto().at_least(200.))
            .column(Column::auto().at_least(100.))
            .column(Column::auto().at_least(140.))
            .column(Column::remainder())
            .header(20., |mut header| {
                for key in [Text::Name, Text::Date, Text::Location] {
                    header.col(|ui| {
                        ui.strong(view.text(key));
                    });
                }
                header.col(|_| {});
            })
            .body(|body| {
                body.rows(22., self.competitions.len(), |mut row| {
                    let competition = &self.competitions[row.index()];
                    row.col(|ui| {
                        ui.label(competition.name.as_str());
                    });
                    row.col(|ui| {
                        ui.label(competition.date.to_string());
                    });
                    row.col(|ui| {
                        ui.label(competition.location.as_deref().unwrap_or("-"));
                    });
                    row.col(|ui| {
                        if ui.small_button(view.text(Text::Edit)).clicked() {
                            edit = Some(CompetitionForm::edit(competition));
                        }
                        if ui
                            .add_enabled(!busy, egui::Button::new(view.text(Text::Delete)).small())
                            .clicked()
                        {
                            delete = Some(competition.id.clone());
                        }
                    });
                });
            });
        if let Some(form) = edit {
            self.form = form;
        }
        if let Some(id) = delete {
            self.delete(view, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_competition_form_validation() {
        let mut form = CompetitionForm {
            name: "  ".to_string(),
            date: "2024-06-01".to_string(),
            ..Default::default()
        };
        assert!(form.draft().is_err());

        form.name = "Yokohama Sprint ".to_string();
        form.location = " ".to_string();
        let draft = form.draft().unwrap();
        assert_eq!(draft.name, "Yokohama Sprint");
        assert!(draft.location.is_none());

        form.date = "06/01/2024".to_string();
        assert!(form.draft().is_err());
    }
}
