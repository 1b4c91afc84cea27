//! Static page generation
//!
//! Renders the store into Markdown pages (TOML front matter plus HTML body)
//! for the site generator: one page per session and speaker, index pages for
//! both, and a schedule grouped by day and start time. Tombstoned entities are
//! left out.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::store::{RecordStore, Session, Speaker};
use crate::Result;

/// Lower-case `s` and collapse every run of non-word characters into `-`
///
/// Letters, digits and `_` are word characters. Leading and trailing dashes
/// are stripped.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Wrap page content in front matter
pub fn render_page(path: &str, title: &str, content: &str) -> String {
    format!("+++\ntitle = '''{title}'''\npath = '''{path}'''\n+++\n\n{content}\n")
}

pub fn session_page(path: &str, base_url: &str, session: &Session, store: &RecordStore) -> String {
    let data = session.data();
    let speakers = link_list(data.speakers(), |stub| {
        live_speaker(store, stub)
            .map(|speaker| speaker.link(base_url))
            .unwrap_or_else(|| format!("(unknown speaker with identifier {stub})"))
    });

    let content = format!(
        "<h1>{name}</h1>\n\
         <h2>Date/Time</h2>\n\
         <p>{day}<br>\n\
         {start} – {end} ({timezone})</p>\n\
         <h2>Description</h2>\n\
         {description}\n\
         <h2>Speakers</h2>\n\
         {speakers}",
        name = data.name(),
        day = data.start().format("%A, %B %d, %Y"),
        start = data.start().format("%I:%M %p"),
        end = data.end().format("%I:%M %p"),
        timezone = data.timezone_name(),
        description = data.description(),
    );
    render_page(path, data.name(), &content)
}

pub fn speaker_page(path: &str, base_url: &str, speaker: &Speaker, store: &RecordStore) -> String {
    let data = speaker.data();
    let sessions = link_list(data.presenter_at(), |stub| {
        live_session(store, stub)
            .map(|session| session.link(base_url))
            .unwrap_or_else(|| format!("(unknown session with identifier {stub})"))
    });

    let content = format!(
        "<h1>{name}</h1>\n\
         <h2>Biography</h2>\n\
         <p>{biography}</p>\n\
         <h2>Sessions</h2>\n\
         {sessions}",
        name = data.display_name(),
        biography = data.biography(),
    );
    render_page(path, data.display_name(), &content)
}

/// Sorted list of links under a heading
pub fn index_page(path: &str, title: &str, mut links: Vec<String>) -> String {
    links.sort();
    let items: String = links.iter().map(|link| format!("<li>{link}</li>\n")).collect();
    let content = format!("<h1>{title}</h1>\n<ul>\n{items}</ul>");
    render_page(path, title, &content)
}

/// Sessions grouped by start day, then start time
pub fn schedule_page(path: &str, title: &str, base_url: &str, store: &RecordStore) -> String {
    let mut days: BTreeMap<NaiveDate, BTreeMap<NaiveTime, Vec<String>>> = BTreeMap::new();
    for session in store.sessions().filter(|s| !s.is_deleted()) {
        let start = session.data().start();
        days.entry(start.date_naive())
            .or_default()
            .entry(start.time())
            .or_default()
            .push(session.link(base_url));
    }

    let mut lines = Vec::new();
    for (day, times) in &days {
        lines.push(format!("<h2>{}</h2>", day.format("%A, %B %d, %Y")));
        for (time, links) in times {
            lines.push(format!("<h3>{}</h3>", time.format("%I:%M %p")));
            lines.push("<ul>".to_string());
            lines.extend(links.iter().map(|link| format!("<li>{link}</li>")));
            lines.push("</ul>".to_string());
        }
    }
    render_page(path, title, &lines.join("\n"))
}

/// Regenerate every page under `output_dir`, replacing whatever was there
///
/// Returns the number of pages written.
pub fn generate_pages(store: &RecordStore, base_url: &str, output_dir: &Path) -> Result<usize> {
    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir)?;
    }
    std::fs::create_dir_all(output_dir)?;

    let mut written = 0;
    let mut write = |name: &str, page: String| -> Result<()> {
        let path = output_dir.join(name);
        if path.exists() {
            warn!("Overwriting duplicate page {}", path.display());
        }
        std::fs::write(&path, page)?;
        written += 1;
        Ok(())
    };

    write(
        "schedule.md",
        schedule_page(&format!("{base_url}schedule/"), "Schedule", base_url, store),
    )?;

    let mut links = Vec::new();
    for session in store.sessions().filter(|s| !s.is_deleted()) {
        let page = session_page(&format!("{base_url}{}", session.url_relpath()), base_url, session, store);
        write(&format!("session-{}.md", session.slugified_name()), page)?;
        links.push(session.link(base_url));
    }
    write(
        "sessions.md",
        index_page(&format!("{base_url}sessions/"), "Sessions", links),
    )?;

    let mut links = Vec::new();
    for speaker in store.speakers().filter(|s| !s.is_deleted()) {
        let page = speaker_page(&format!("{base_url}{}", speaker.url_relpath()), base_url, speaker, store);
        write(&format!("speaker-{}.md", speaker.slugified_name()), page)?;
        links.push(speaker.link(base_url));
    }
    write(
        "speakers.md",
        index_page(&format!("{base_url}speakers/"), "Speakers", links),
    )?;

    info!("Generated {} pages in {}", written, output_dir.display());
    Ok(written)
}

fn live_speaker<'a>(store: &'a RecordStore, stub: &str) -> Option<&'a Speaker> {
    store.speaker(stub).filter(|s| !s.is_deleted())
}

fn live_session<'a>(store: &'a RecordStore, stub: &str) -> Option<&'a Session> {
    store.session(stub).filter(|s| !s.is_deleted())
}

fn link_list(stubs: &[String], render: impl Fn(&str) -> String) -> String {
    if stubs.is_empty() {
        return "<p>None yet</p>".to_string();
    }
    let items: String = stubs
        .iter()
        .map(|stub| format!("<li>{}</li>", render(stub.as_str())))
        .collect();
    format!("<ul>{items}</ul>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Opening Night: Recital!"), "opening-night-recital");
        assert_eq!(slugify("  Bach & Sons  "), "bach-sons");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Café Müller"), "café-müller");
    }

    #[test]
    fn test_slugify_empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("–!?"), "");
    }

    #[test]
    fn test_render_page_front_matter() {
        let page = render_page("https://example.org/x/", "X", "<p>hi</p>");
        assert!(page.starts_with("+++\ntitle = '''X'''\npath = '''https://example.org/x/'''\n+++\n"));
        assert!(page.ends_with("<p>hi</p>\n"));
    }

    #[test]
    fn test_index_page_sorts_links() {
        let page = index_page("p", "Sessions", vec!["b".into(), "a".into()]);
        let a = page.find("<li>a</li>").unwrap();
        let b = page.find("<li>b</li>").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_link_list_empty() {
        assert_eq!(link_list(&[], |s| s.to_string()), "<p>None yet</p>");
    }
}
