use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

use super::AppContext;
use crate::output::Output;

pub async fn run_recent(clear: bool, output: &Output) -> Result<()> {
    let ctx = AppContext::init()?;
    let mut recent = ctx.recently_viewed();

    if clear {
        recent.clear().map_err(|e| eyre!("{}", e))?;
        output.success("Cleared the recently-viewed list");
        return Ok(());
    }

    if recent.is_empty() {
        output.info("No recently viewed movies");
        output.payload(&json!({ "movies": [] }));
        return Ok(());
    }

    if output.shows_human_data() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Id", "Title", "Year", "Viewed"]);
        for movie in recent.list() {
            table.add_row(vec![
                Cell::new(&movie.imdb_id),
                Cell::new(&movie.title),
                Cell::new(&movie.year),
                Cell::new(movie.viewed_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }
        println!("{}", table);
    }

    output.payload(&json!({
        "movies": recent.list().iter().map(|m| json!({
            "imdb_id": m.imdb_id,
            "title": m.title,
            "year": m.year,
            "viewed_at": m.viewed_at,
        })).collect::<Vec<_>>(),
    }));

    Ok(())
}
