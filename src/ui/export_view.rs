use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use egui::{Color32, RichText, Ui};
use log::{error, warn};

use tridash::TridashError;
use tridash::export::{ExportFormat, ExportHistory, ExportJob, ExportRecord, run_export};
use tridash::i18n::Text;
use tridash::timestamp::to_display_string;

use super::data_view::DataView;
use super::worker::Fetch;
use super::{ViewContext, error_banner};

/// Exports whatever the sensor data tab currently shows, using its scope and filters.
pub(crate) struct ExportView {
    format: ExportFormat,
    split: bool,
    split_days: Option<u32>,
    output_dir: PathBuf,
    run: Fetch<Vec<ExportRecord>>,
    history: Option<ExportHistory>,
    last_run: Vec<ExportRecord>,
    error: Option<TridashError>,
}

impl ExportView {
    pub(crate) fn new() -> Self {
        let history = match ExportHistory::load_default() {
            Ok(history) => Some(history),
            Err(e) => {
                warn!("Export history unavailable: {}", e);
                None
            }
        };
        Self {
            format: ExportFormat::default(),
            split: false,
            split_days: None,
            output_dir: dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            run: Fetch::new("export"),
            history,
            last_run: Vec::new(),
            error: None,
        }
    }

    fn start(&mut self, view: &ViewContext, data: &DataView) {
        let Some(scope) = data.scope().cloned() else {
            return;
        };
        let state = data.filter_state();
        let split_days = self.split_days.unwrap_or(view.config.export_split_days);
        let job = ExportJob {
            scope,
            filters: state.filters().clone(),
            order: state.order(),
            format: self.format,
            split_days: self.split.then_some(split_days),
        };
        // reject jobs that cannot be planned before anything is requested
        if let Err(e) = job.plan(Utc::now()) {
            self.error = Some(e);
            return;
        }
        self.error = None;
        let client = view.client.clone();
        let output_dir = self.output_dir.clone();
        let delay = Duration::from_millis(view.config.export_delay_ms);
        self.run.start(view.worker, async move {
            run_export(&client, &job, &output_dir, delay, Utc::now()).await
        });
    }

    fn record_run(&mut self, records: Vec<ExportRecord>) {
        if let Some(history) = &mut self.history {
            for record in &records {
                history.push(record.clone());
            }
            if let Err(e) = history.save() {
                error!("Error while saving export history: {}", e);
            }
        }
        self.last_run = records;
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext, data: &DataView) {
        if let Some(result) = self.run.poll() {
            match result {
                Ok(records) => self.record_run(records),
                Err(e) => self.error = Some(e),
            }
        }

        let Some(scope) = data.scope() else {
            ui.label(view.text(Text::NoData));
            return;
        };
        ui.label(RichText::new(scope.file_prefix()).weak());
        let filters = data.filter_state().filters();
        if !filters.is_empty() {
            let summary = filters.describe(view.locale()).join("  ·  ");
            ui.label(RichText::new(summary).small().weak());
        }

        egui::Grid::new("export_options")
            .num_columns(2)
            .spacing([12., 6.])
            .show(ui, |ui| {
                ui.label(view.text(Text::Format));
                ui.horizontal(|ui| {
                    for format in ExportFormat::ALL {
                        ui.radio_value(&mut self.format, format, format.display_name());
                    }
                });
                ui.end_row();

                ui.label(view.text(Text::SplitFiles));
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.split, "");
                    let mut days = self.split_days.unwrap_or(view.config.export_split_days);
                    let changed = ui
                        .add_enabled(self.split, egui::DragValue::new(&mut days).range(1..=31).suffix(" d"))
                        .changed();
                    if changed {
                        self.split_days = Some(days);
                    }
                });
                ui.end_row();

                ui.label(view.text(Text::OutputFolder));
                ui.horizontal(|ui| {
                    ui.label(self.output_dir.display().to_string());
                    if ui.button(view.text(Text::ChooseFile)).clicked()
                        && let Some(dir) = rfd::FileDialog::new()
                            .set_directory(&self.output_dir)
                            .pick_folder()
                    {
                        self.output_dir = dir;
                    }
                });
                ui.end_row();
            });

        let running = self.run.is_loading();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!running, egui::Button::new(view.text(Text::Export)))
                .clicked()
            {
                self.start(view, data);
            }
            if running {
                ui.spinner();
                if ui.button(view.text(Text::Cancel)).clicked() {
                    self.run.cancel();
                }
            }
        });

        let retry = self
            .error
            .as_ref()
            .is_some_and(|error| error_banner(ui, error, view.locale()));
        if retry {
            self.start(view, data);
        }

        for record in &self.last_run {
            ui.label(RichText::new(format!("✔ {}", record.path.display())).color(Color32::LIGHT_GREEN));
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.heading(view.text(Text::History));
            if let Some(history) = &mut self.history
                && !history.is_empty()
                && ui.small_button(view.text(Text::Delete)).clicked()
            {
                history.clear();
                if let Err(e) = history.save() {
                    error!("Error while saving export history: {}", e);
                }
            }
        });
        let Some(history) = &self.history else {
            return;
        };
        egui::ScrollArea::vertical().max_height(240.).show(ui, |ui| {
            for record in history.entries() {
                ui.horizontal(|ui| {
                    ui.label(to_display_string(&record.exported_at));
                    ui.label(record.format.display_name());
                    ui.label(record.file_name.as_str());
                    if let Some(rows) = record.rows {
                        ui.label(RichText::new(format!("{} rows", rows)).weak());
                    }
                });
            }
        });
    }
}
