use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Japanese,
}

/// Display strings used by the dashboard, the CLI and chart labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    SkinTemperature,
    CoreTemperature,
    Wbgt,
    HeartRate,
    TemperatureAxis,
    HeartRateAxis,
    Swim,
    Bike,
    Run,
    NetworkError,
    SessionExpired,
    ServerError,
    UnexpectedResponse,
    InvalidInput,
    LocalFileError,
    NoData,
    Loading,
    Retry,
    Reload,
    Dismiss,
    SomethingWentWrong,
    Login,
    Logout,
    Username,
    Password,
    SensorData,
    Feedback,
    Users,
    Competitions,
    Export,
    ResetFilters,
    SensorId,
    StartDate,
    EndDate,
    MinTemperature,
    MaxTemperature,
    Search,
    PageSize,
    Previous,
    Next,
    Timestamp,
    OffsetMinutes,
    Name,
    Date,
    Location,
    Create,
    Update,
    Delete,
    ImportUsers,
    ChooseFile,
    Upload,
    Format,
    SplitFiles,
    History,
    Apply,
    Participant,
    Description,
    Cancel,
    Edit,
    OutputFolder,
    NewestFirst,
    OldestFirst,
    ShowChart,
    Refresh,
}

impl Locale {
    pub fn text(self, key: Text) -> &'static str {
        let (en, ja) = match key {
            Text::SkinTemperature => ("Skin temperature", "皮膚温度"),
            Text::CoreTemperature => ("Core temperature", "深部体温"),
            Text::Wbgt => ("WBGT", "WBGT"),
            Text::HeartRate => ("Heart rate", "心拍数"),
            Text::TemperatureAxis => ("Temperature (°C)", "温度 (°C)"),
            Text::HeartRateAxis => ("Heart rate (bpm)", "心拍数 (bpm)"),
            Text::Swim => ("Swim", "スイム"),
            Text::Bike => ("Bike", "バイク"),
            Text::Run => ("Run", "ラン"),
            Text::NetworkError => (
                "Could not reach the server",
                "サーバーに接続できませんでした",
            ),
            Text::SessionExpired => (
                "Session expired, please log in again",
                "セッションの有効期限が切れました。再度ログインしてください",
            ),
            Text::ServerError => ("Server error", "サーバーエラー"),
            Text::UnexpectedResponse => (
                "Unexpected response from the server",
                "サーバーから予期しない応答がありました",
            ),
            Text::InvalidInput => ("Invalid input", "入力が不正です"),
            Text::LocalFileError => ("Local file error", "ローカルファイルエラー"),
            Text::NoData => ("No data", "データがありません"),
            Text::Loading => ("Loading...", "読み込み中..."),
            Text::Retry => ("Retry", "再試行"),
            Text::Reload => ("Reload", "再読み込み"),
            Text::Dismiss => ("Dismiss", "閉じる"),
            Text::SomethingWentWrong => ("Something went wrong", "問題が発生しました"),
            Text::Login => ("Log in", "ログイン"),
            Text::Logout => ("Log out", "ログアウト"),
            Text::Username => ("Username", "ユーザー名"),
            Text::Password => ("Password", "パスワード"),
            Text::SensorData => ("Sensor data", "センサーデータ"),
            Text::Feedback => ("Race feedback", "レースフィードバック"),
            Text::Users => ("Users", "ユーザー"),
            Text::Competitions => ("Competitions", "大会"),
            Text::Export => ("Export", "エクスポート"),
            Text::ResetFilters => ("Reset filters", "フィルターをリセット"),
            Text::SensorId => ("Sensor ID", "センサーID"),
            Text::StartDate => ("Start date", "開始日"),
            Text::EndDate => ("End date", "終了日"),
            Text::MinTemperature => ("Min temperature", "最低温度"),
            Text::MaxTemperature => ("Max temperature", "最高温度"),
            Text::Search => ("Search", "検索"),
            Text::PageSize => ("Rows per page", "表示件数"),
            Text::Previous => ("Previous", "前へ"),
            Text::Next => ("Next", "次へ"),
            Text::Timestamp => ("Timestamp", "日時"),
            Text::OffsetMinutes => ("Padding (min)", "前後の余白 (分)"),
            Text::Name => ("Name", "名前"),
            Text::Date => ("Date", "日付"),
            Text::Location => ("Location", "場所"),
            Text::Create => ("Create", "作成"),
            Text::Update => ("Update", "更新"),
            Text::Delete => ("Delete", "削除"),
            Text::ImportUsers => ("Import users from CSV", "CSVからユーザーを一括登録"),
            Text::ChooseFile => ("Choose file", "ファイルを選択"),
            Text::Upload => ("Upload", "アップロード"),
            Text::Format => ("Format", "形式"),
            Text::SplitFiles => ("Split into daily files", "日ごとにファイルを分割"),
            Text::History => ("Export history", "エクスポート履歴"),
            Text::Apply => ("Apply", "適用"),
            Text::Participant => ("Participant", "参加者"),
            Text::Description => ("Description", "説明"),
            Text::Cancel => ("Cancel", "キャンセル"),
            Text::Edit => ("Edit", "編集"),
            Text::OutputFolder => ("Output folder", "保存先フォルダ"),
            Text::NewestFirst => ("Newest first", "新しい順"),
            Text::OldestFirst => ("Oldest first", "古い順"),
            Text::ShowChart => ("Show chart", "グラフを表示"),
            Text::Refresh => ("Refresh", "更新"),
        };
        match self {
            Locale::English => en,
            Locale::Japanese => ja,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_differ_per_locale() {
        assert_eq!(Locale::English.text(Text::HeartRate), "Heart rate");
        assert_eq!(Locale::Japanese.text(Text::HeartRate), "心拍数");
        // WBGT is an acronym in both languages
        assert_eq!(
            Locale::English.text(Text::Wbgt),
            Locale::Japanese.text(Text::Wbgt)
        );
    }
}
