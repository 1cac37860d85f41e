use crate::domain::model::DreamView;
use crate::utils::error::Result;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 9] = [
    "id",
    "date",
    "title",
    "mood",
    "content",
    "transcript",
    "summary",
    "sentiment",
    "interpretation",
];

/// 將夢境寫成 CSV，回傳寫入的筆數
pub fn write_csv<W: Write>(dreams: &[DreamView], output: W) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(HEADER)?;

    for view in dreams {
        let dream = &view.dream;
        writer.write_record([
            dream.id.as_str(),
            view.date.as_str(),
            view.title.as_str(),
            view.mood.as_str(),
            dream.content.as_str(),
            dream.transcript.as_deref().unwrap_or(""),
            dream.summary.as_deref().unwrap_or(""),
            dream.sentiment.as_ref().map(|s| s.label.as_str()).unwrap_or(""),
            dream.interpretation.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(dreams.len())
}

pub fn export_csv(dreams: &[DreamView], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    let count = write_csv(dreams, file)?;
    tracing::info!("📁 Exported {} dreams to {}", count, path.display());
    Ok(count)
}
