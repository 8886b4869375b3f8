use egui::{RichText, TextEdit, Ui};
use egui_extras::{Column, TableBuilder};
use log::debug;

use tridash::TridashError;
use tridash::api::DataScope;
use tridash::chart::{ChartData, format_chart_data};
use tridash::filters::{FilterInput, FilterState, PAGE_SIZE_CHOICES, SortOrder};
use tridash::i18n::{Locale, Text};
use tridash::model::{Account, DataPage, ManagedUser, SensorSample};
use tridash::timestamp::to_display_string;

use super::worker::Fetch;
use super::{ViewContext, error_banner, plot, reading_cell};

/// Paged sensor data table with filters. Participants see their own data, admins pick a
/// participant first.
pub(crate) struct DataView {
    state: FilterState,
    input: FilterInput,
    scope: Option<DataScope>,
    participants: Vec<ManagedUser>,
    participants_fetch: Fetch<Vec<ManagedUser>>,
    participants_requested: bool,
    page: DataPage<SensorSample>,
    page_fetch: Fetch<DataPage<SensorSample>>,
    reload: bool,
    error: Option<TridashError>,
    show_chart: bool,
    chart: Option<(Locale, ChartData)>,
}

impl DataView {
    pub(crate) fn new(page_size: u32) -> Self {
        Self {
            state: FilterState::new(page_size),
            input: FilterInput::default(),
            scope: None,
            participants: Vec::new(),
            participants_fetch: Fetch::new("participants"),
            participants_requested: false,
            page: DataPage::default(),
            page_fetch: Fetch::new("sensor_data"),
            reload: true,
            error: None,
            show_chart: false,
            chart: None,
        }
    }

    pub(crate) fn scope(&self) -> Option<&DataScope> {
        self.scope.as_ref()
    }

    pub(crate) fn filter_state(&self) -> &FilterState {
        &self.state
    }

    fn set_scope(&mut self, scope: DataScope) {
        if self.scope.as_ref() != Some(&scope) {
            self.scope = Some(scope);
            self.state.set_page(0);
            self.page = DataPage::default();
            self.chart = None;
            self.reload = true;
        }
    }

    fn request_page(&mut self, view: &ViewContext) {
        let Some(scope) = self.scope.clone() else {
            return;
        };
        let query = self.state.query();
        debug!("Loading sensor data page {:?}", query.pagination);
        let client = view.client.clone();
        self.page_fetch.start(view.worker, async move {
            client.sensor_data(&scope, &query).await
        });
        self.reload = false;
    }

    fn request_participants(&mut self, view: &ViewContext) {
        let client = view.client.clone();
        self.participants_fetch
            .start(view.worker, async move { client.users().await });
        self.participants_requested = true;
    }

    fn poll(&mut self) {
        if let Some(result) = self.page_fetch.poll() {
            match result {
                Ok(page) => {
                    self.page = page;
                    self.chart = None;
                    self.error = None;
                }
                Err(e) => self.error = Some(e),
            }
        }
        if let Some(result) = self.participants_fetch.poll() {
            match result {
                Ok(users) => self.participants = users,
                Err(e) => self.error = Some(e),
            }
        }
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, view: &ViewContext, account: &Account) {
        self.poll();
        match account {
            Account::User(_) => self.set_scope(DataScope::Own),
            Account::Admin(_) => {
                if !self.participants_requested {
                    self.request_participants(view);
                }
                self.participant_picker(ui, view);
            }
        }
        if self.reload {
            self.request_page(view);
        }

        self.filter_form(ui, view);
        ui.separator();
        self.paging_controls(ui, view);

        let retry = self
            .error
            .as_ref()
            .is_some_and(|error| error_banner(ui, error, view.locale()));
        if retry {
            self.error = None;
            self.reload = true;
        }

        if self.scope.is_none() {
            return;
        }
        if self.page_fetch.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(view.text(Text::Loading));
            });
        }
        if self.page.data.is_empty() {
            ui.label(view.text(Text::NoData));
            return;
        }

        if self.show_chart {
            let locale = view.locale();
            let stale = self.chart.as_ref().is_none_or(|(built_for, _)| *built_for != locale);
            if stale {
                self.chart = Some((locale, format_chart_data(&self.page.data, locale)));
            }
            let origin = self.page.data.iter().map(|s| s.timestamp).min();
            if let (Some((_, chart)), Some(origin)) = (&self.chart, origin) {
                ui.allocate_ui(egui::vec2(ui.available_width(), 280.), |ui| {
                    plot::sensor_plot(ui, "sensor_data_plot", chart, None, origin, locale);
                });
            }
            ui.separator();
        }
        self.table(ui, view);
    }

    fn participant_picker(&mut self, ui: &mut Ui, view: &ViewContext) {
        let selected = match &self.scope {
            Some(DataScope::User(user_id)) => self
                .participants
                .iter()
                .find(|u| &u.user_id == user_id)
                .map_or_else(|| user_id.clone(), |u| u.username.clone()),
            _ => "-".to_string(),
        };
        let mut choice = None;
        ui.horizontal(|ui| {
            ui.label(view.text(Text::Participant));
            egui::ComboBox::from_id_salt("participant")
                .selected_text(selected)
                .width(220.)
                .show_ui(ui, |ui| {
                    for user in &self.participants {
                        let label = match &user.full_name {
                            Some(name) => format!("{} ({})", user.username, name),
                            None => user.username.clone(),
                        };
                        if ui.selectable_label(false, label).clicked() {
                            choice = Some(user.user_id.clone());
                        }
                    }
                });
            if self.participants_fetch.is_loading() {
                ui.spinner();
            }
        });
        if let Some(user_id) = choice {
            self.set_scope(DataScope::User(user_id));
        }
    }

    fn filter_form(&mut self, ui: &mut Ui, view: &ViewContext) {
        egui::Grid::new("data_filters")
            .num_columns(4)
            .spacing([12., 6.])
            .show(ui, |ui| {
                ui.label(view.text(Text::SensorId));
                ui.add(TextEdit::singleline(&mut self.input.sensor_id).desired_width(140.));
                ui.label(view.text(Text::Search));
                ui.add(TextEdit::singleline(&mut self.input.search).desired_width(140.));
                ui.end_row();

                ui.label(view.text(Text::StartDate));
                ui.add(
                    TextEdit::singleline(&mut self.input.start_date)
                        .hint_text("YYYY-MM-DD")
                        .desired_width(140.),
                );
                ui.label(view.text(Text::EndDate));
                ui.add(
                    TextEdit::singleline(&mut self.input.end_date)
                        .hint_text("YYYY-MM-DD")
                        .desired_width(140.),
                );
                ui.end_row();

                ui.label(view.text(Text::MinTemperature));
                ui.add(TextEdit::singleline(&mut self.input.min_temperature).desired_width(140.));
                ui.label(view.text(Text::MaxTemperature));
                ui.add(TextEdit::singleline(&mut self.input.max_temperature).desired_width(140.));
                ui.end_row();
            });

        ui.horizontal(|ui| {
            if ui.button(view.text(Text::Apply)).clicked() {
                match self.input.parse() {
                    Ok(filters) => {
                        self.state.replace_filters(filters);
                        self.error = None;
                        self.reload = true;
                    }
                    Err(e) => self.error = Some(e),
                }
            }
            if ui.button(view.text(Text::ResetFilters)).clicked() {
                self.state.reset();
                self.input = FilterInput::default();
                self.error = None;
                self.reload = true;
            }
            ui.checkbox(&mut self.show_chart, view.text(Text::ShowChart));
        });
    }

    fn paging_controls(&mut self, ui: &mut Ui, view: &ViewContext) {
        let pagination = self.state.pagination();
        let total = self.page.total;
        ui.horizontal(|ui| {
            let mut page_size = pagination.page_size;
            ui.label(view.text(Text::PageSize));
            egui::ComboBox::from_id_salt("page_size")
                .selected_text(page_size.to_string())
                .show_ui(ui, |ui| {
                    for choice in PAGE_SIZE_CHOICES {
                        ui.selectable_value(&mut page_size, choice, choice.to_string());
                    }
                });
            if page_size != pagination.page_size {
                self.state.set_page_size(page_size);
                self.reload = true;
            }

            let mut order = self.state.order();
            egui::ComboBox::from_id_salt("sort_order")
                .selected_text(order_label(order, view))
                .show_ui(ui, |ui| {
                    for choice in [SortOrder::Desc, SortOrder::Asc] {
                        ui.selectable_value(&mut order, choice, order_label(choice, view));
                    }
                });
            if order != self.state.order() {
                self.state.set_order(order);
                self.reload = true;
            }

            ui.separator();
            if ui
                .add_enabled(pagination.page > 0, egui::Button::new(view.text(Text::Previous)))
                .clicked()
            {
                self.state.previous_page();
                self.reload = true;
            }
            ui.label(format!(
                "{} / {}",
                pagination.page + 1,
                pagination.total_pages(total).max(1)
            ));
            if ui
                .add_enabled(pagination.has_next(total), egui::Button::new(view.text(Text::Next)))
                .clicked()
            {
                self.state.next_page(total);
                self.reload = true;
            }
            ui.label(RichText::new(format!("({})", total)).weak());
            if ui.button(view.text(Text::Refresh)).clicked() {
                self.reload = true;
            }
        });
    }

    fn table(&self, ui: &mut Ui, view: &ViewContext) {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto().at_least(150.))
            .column(Column::auto().at_least(90.))
            .columns(Column::remainder(), 4)
            .header(20., |mut header| {
                for key in [
                    Text::Timestamp,
                    Text::SensorId,
                    Text::SkinTemperature,
                    Text::CoreTemperature,
                    Text::Wbgt,
                    Text::HeartRate,
                ] {
                    header.col(|ui| {
                        ui.strong(view.text(key));
                    });
                }
            })
            .body(|body| {
                body.rows(18., self.page.data.len(), |mut row| {
                    let sample = &self.page.data[row.index()];
                    row.col(|ui| {
                        ui.label(to_display_string(&sample.timestamp));
                    });
                    row.col(|ui| {
                        ui.label(sample.sensor_id.as_str());
                    });
                    for value in [
                        sample.skin_temperature,
                        sample.core_temperature,
                        sample.wbgt,
                        sample.heart_rate,
                    ] {
                        row.col(|ui| {
                            ui.label(reading_cell(value));
                        });
                    }
                });
            });
    }
}

fn order_label(order: SortOrder, view: &ViewContext) -> &'static str {
    match order {
        SortOrder::Desc => view.text(Text::NewestFirst),
        SortOrder::Asc => view.text(Text::OldestFirst),
    }
}
