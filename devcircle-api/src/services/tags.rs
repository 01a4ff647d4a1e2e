use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use devcircle_shared::errors::AppResult;

use crate::models::{NewContentTag, NewTag, Tag};
use crate::schema::{content_tags, tags};

/// Outcome of reconciling a content item's tag set against a list of
/// candidate titles: join rows to add and join rows to drop. Tag rows
/// themselves are never deleted here — other content may reference them.
#[derive(Debug, Default, PartialEq)]
pub struct TagDelta {
    pub connect_ids: Vec<Uuid>,
    pub disconnect_ids: Vec<Uuid>,
}

/// Trim candidates, drop empties, and dedupe case-insensitively. The first
/// spelling of a title wins, so "Tech Stack" followed by "tech stack"
/// resolves to a single candidate titled "Tech Stack".
pub fn normalize_titles(raw: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for title in raw {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(trimmed.to_string());
    }
    out
}

/// Candidate titles with no case-insensitive match among `found`.
fn missing_titles(wanted: &[String], found: &[Tag]) -> Vec<String> {
    wanted
        .iter()
        .filter(|title| {
            !found
                .iter()
                .any(|tag| tag.title.eq_ignore_ascii_case(title))
        })
        .cloned()
        .collect()
}

/// Ids attached to the content but absent from the new connect set.
fn stale_ids(existing: &[Tag], connect_ids: &[Uuid]) -> Vec<Uuid> {
    existing
        .iter()
        .map(|tag| tag.id)
        .filter(|id| !connect_ids.contains(id))
        .collect()
}

/// An ILIKE pattern that matches `title` exactly, case-insensitively.
/// Wildcard characters in the title are escaped so user input cannot widen
/// the match.
fn exact_ci_pattern(title: &str) -> String {
    title
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn load_by_titles(conn: &mut PgConnection, wanted: &[String]) -> QueryResult<Vec<Tag>> {
    let mut query = tags::table.into_boxed();
    for title in wanted {
        query = query.or_filter(tags::title.ilike(exact_ci_pattern(title)));
    }
    query.load::<Tag>(conn)
}

/// Resolve `candidate_titles` to tag ids, creating tags that do not exist
/// yet, and compute which of `existing_on_content` should be detached.
///
/// Runs inside the caller's transaction (content create/update), so a
/// failure anywhere aborts the whole unit. Concurrent first-use of a new
/// title is absorbed by the unique index on lower(title): the insert skips
/// the conflicting row and the re-read picks up whichever row won.
///
/// Calling this twice with the same candidates yields the same connect set
/// and an empty disconnect set the second time.
pub fn reconcile(
    conn: &mut PgConnection,
    candidate_titles: &[String],
    existing_on_content: &[Tag],
) -> AppResult<TagDelta> {
    let wanted = normalize_titles(candidate_titles);
    if wanted.is_empty() {
        return Ok(TagDelta {
            connect_ids: Vec::new(),
            disconnect_ids: existing_on_content.iter().map(|t| t.id).collect(),
        });
    }

    let found = load_by_titles(conn, &wanted)?;

    let to_create: Vec<NewTag> = missing_titles(&wanted, &found)
        .into_iter()
        .map(|title| NewTag { title })
        .collect();

    if !to_create.is_empty() {
        diesel::insert_into(tags::table)
            .values(&to_create)
            .on_conflict_do_nothing()
            .execute(conn)?;
    }

    // Re-read so rows created above or by a concurrent writer are all seen.
    let all = load_by_titles(conn, &wanted)?;
    let connect_ids: Vec<Uuid> = all.iter().map(|tag| tag.id).collect();
    let disconnect_ids = stale_ids(existing_on_content, &connect_ids);

    Ok(TagDelta {
        connect_ids,
        disconnect_ids,
    })
}

/// Apply a delta to one content row: add missing join rows, drop stale ones.
pub fn apply_delta(conn: &mut PgConnection, content_id: Uuid, delta: &TagDelta) -> AppResult<()> {
    if !delta.connect_ids.is_empty() {
        let rows: Vec<NewContentTag> = delta
            .connect_ids
            .iter()
            .map(|&tag_id| NewContentTag { content_id, tag_id })
            .collect();
        diesel::insert_into(content_tags::table)
            .values(&rows)
            .on_conflict_do_nothing()
            .execute(conn)?;
    }

    if !delta.disconnect_ids.is_empty() {
        diesel::delete(
            content_tags::table
                .filter(content_tags::content_id.eq(content_id))
                .filter(content_tags::tag_id.eq_any(&delta.disconnect_ids)),
        )
        .execute(conn)?;
    }

    Ok(())
}

pub fn tags_for_content(conn: &mut PgConnection, content_id: Uuid) -> QueryResult<Vec<Tag>> {
    content_tags::table
        .inner_join(tags::table)
        .filter(content_tags::content_id.eq(content_id))
        .select(tags::all_columns)
        .load::<Tag>(conn)
}

/// Batch variant for feed pages: one query, grouped by content id.
pub fn tags_for_contents(
    conn: &mut PgConnection,
    content_ids: &[Uuid],
) -> QueryResult<HashMap<Uuid, Vec<Tag>>> {
    if content_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, Tag)> = content_tags::table
        .inner_join(tags::table)
        .filter(content_tags::content_id.eq_any(content_ids))
        .select((content_tags::content_id, tags::all_columns))
        .load(conn)?;

    let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (content_id, tag) in rows {
        grouped.entry(content_id).or_default().push(tag);
    }
    Ok(grouped)
}

/// Case-insensitive tag title search for the tag picker.
pub fn search_by_title(conn: &mut PgConnection, needle: &str, limit: i64) -> QueryResult<Vec<Tag>> {
    let pattern = format!("%{}%", exact_ci_pattern(needle));
    tags::table
        .filter(tags::title.ilike(pattern))
        .limit(limit)
        .load::<Tag>(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(title: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            title: title.to_string(),
        }
    }

    #[test]
    fn normalize_trims_and_dedupes() {
        let raw = vec![
            "  Tech Stack ".to_string(),
            "tech stack".to_string(),
            "".to_string(),
            "   ".to_string(),
            "Rust".to_string(),
        ];
        assert_eq!(normalize_titles(&raw), vec!["Tech Stack", "Rust"]);
    }

    #[test]
    fn missing_is_case_insensitive() {
        let found = vec![tag("tech stack")];
        let wanted = vec!["Tech Stack".to_string(), "Web Development".to_string()];
        assert_eq!(missing_titles(&wanted, &found), vec!["Web Development"]);
    }

    #[test]
    fn stale_ids_is_a_set_difference() {
        let a = tag("a");
        let b = tag("b");
        let c = tag("c");
        let d = tag("d");
        // content tagged {a,b,c}, new target set {b,c,d}
        let connect = vec![b.id, c.id, d.id];
        let existing = vec![a.clone(), b, c];
        assert_eq!(stale_ids(&existing, &connect), vec![a.id]);
    }

    #[test]
    fn stale_ids_empty_when_target_superset() {
        let a = tag("a");
        let connect = vec![a.id, Uuid::new_v4()];
        assert!(stale_ids(&[a], &connect).is_empty());
    }

    #[test]
    fn second_pass_has_nothing_to_create_or_drop() {
        // once the candidate set is attached, reconciling it again must
        // produce no creations and no disconnects
        let a = tag("Rust");
        let b = tag("wasm");
        let wanted = normalize_titles(&["rust".to_string(), "Wasm".to_string()]);
        assert!(missing_titles(&wanted, &[a.clone(), b.clone()]).is_empty());
        assert!(stale_ids(&[a.clone(), b.clone()], &[a.id, b.id]).is_empty());
    }

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(exact_ci_pattern("100% rust_lang"), "100\\% rust\\_lang");
        assert_eq!(exact_ci_pattern("back\\slash"), "back\\\\slash");
        assert_eq!(exact_ci_pattern("plain"), "plain");
    }
}
