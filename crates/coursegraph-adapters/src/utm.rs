//! Mississauga (UTM) adapter: the student timetable HTML page, one request
//! per numeric subject area.

use std::collections::BTreeMap;

use async_trait::async_trait;
use coursegraph_core::{Campus, RawCourseRecord};
use coursegraph_storage::HttpFetcher;
use scraper::Html;
use serde::Deserialize;

use crate::{selector, sibling_text, text_or_none, AdapterError, CampusSource, MineContext};

#[derive(Debug, Clone, Deserialize)]
pub struct UtmSource {
    pub timetable_url: String,
    pub session: String,
    /// Subject areas are addressed by index, 1..=subject_areas.
    pub subject_areas: u32,
}

/// Requirement labels as they appear inline in the course detail blob; the
/// description text runs up to the first of these.
const DETAIL_LABELS: [&str; 3] = ["Exclusion:", "Prerequisite:", "Corequisite:"];

fn truncate_before_labels(text: &str) -> String {
    let cut = DETAIL_LABELS
        .iter()
        .filter_map(|label| text.find(label))
        .min()
        .unwrap_or(text.len());
    text[..cut].trim().to_string()
}

/// Parse one subject area's timetable page. Each course lives in a
/// `div[id$="-span"]` block whose `<h4>` reads `CODE - Title`; requirement
/// text follows `<strong>` labels inside the block.
pub fn parse_timetable(body: &str) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError> {
    let document = Html::parse_document(body);
    let block_sel = selector("div[id$='-span']")?;
    let heading_sel = selector("h4")?;
    let details_sel = selector("div.alert.alert-info.infoCourseDetails.infoCourse")?;
    let strong_sel = selector("strong")?;

    let mut out = BTreeMap::new();

    for block in document.select(&block_sel) {
        let Some(heading) = block
            .select(&heading_sel)
            .next()
            .and_then(|h| text_or_none(h.text().collect::<String>()))
        else {
            continue;
        };
        let Some((raw_code, title)) = heading.split_once(" - ") else {
            continue;
        };
        let raw_code = raw_code.trim().to_string();
        if out.contains_key(&raw_code) {
            continue;
        }

        let description = block
            .select(&details_sel)
            .next()
            .map(|d| d.text().collect::<String>())
            .map(|t| truncate_before_labels(&t))
            .and_then(text_or_none);

        let mut prerequisites = None;
        let mut corequisites = None;
        let mut exclusions = None;

        for strong in block.select(&strong_sel) {
            let label = strong.text().collect::<String>();
            let value = || sibling_text(strong);
            match label.trim() {
                "Exclusion:" => exclusions = exclusions.or_else(value),
                "Prerequisites:" => prerequisites = prerequisites.or_else(value),
                "Corequisites:" => corequisites = corequisites.or_else(value),
                _ => {}
            }
        }

        out.insert(
            raw_code,
            RawCourseRecord {
                title: title.trim().to_string(),
                description,
                prerequisites,
                corequisites,
                exclusions,
            },
        );
    }

    Ok(out)
}

impl UtmSource {
    fn subject_area_url(&self, area: u32) -> String {
        format!(
            "{}?yos=&subjectarea={}&session={}",
            self.timetable_url, area, self.session
        )
    }
}

#[async_trait]
impl CampusSource for UtmSource {
    fn campus(&self) -> Campus {
        Campus::Utm
    }

    async fn mine(
        &self,
        http: &HttpFetcher,
        ctx: &MineContext,
    ) -> Result<BTreeMap<String, RawCourseRecord>, AdapterError> {
        let mut courses = BTreeMap::new();

        for area in 1..=self.subject_areas {
            let url = self.subject_area_url(area);
            let body = http.fetch_text(ctx.run_id, Campus::Utm, &url).await?;
            for (code, record) in parse_timetable(&body)? {
                courses.entry(code).or_insert(record);
            }
        }

        Ok(courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMETABLE: &str = r#"
    <html><body>
      <div id="CSC108H5F-span">
        <h4>CSC108H5F - Introduction to Computer Programming</h4>
        <div class="alert alert-info infoCourseDetails infoCourse">
          Programming in a language such as Python. Exclusion: CSC148H5
        </div>
        <strong>Exclusion:</strong> CSC148H5
        <strong>Prerequisites:</strong> None
      </div>
      <div id="CSC148H5S-span">
        <h4>CSC148H5S - Introduction to Computer Science</h4>
        <div class="alert alert-info infoCourseDetails infoCourse">
          Abstract data types and data structures.
        </div>
        <strong>Prerequisites:</strong> CSC108H5
        <strong>Corequisites:</strong> <em>CSC165H5</em>
      </div>
      <div id="unrelated">
        <h4>Not a course block</h4>
      </div>
    </body></html>
    "#;

    #[test]
    fn timetable_blocks_become_records() {
        let courses = parse_timetable(TIMETABLE).unwrap();
        assert_eq!(courses.len(), 2);

        let csc108 = &courses["CSC108H5F"];
        assert_eq!(csc108.title, "Introduction to Computer Programming");
        assert_eq!(csc108.exclusions.as_deref(), Some("CSC148H5"));
        assert_eq!(csc108.prerequisites.as_deref(), Some("None"));
    }

    #[test]
    fn description_stops_before_the_first_requirement_label() {
        let courses = parse_timetable(TIMETABLE).unwrap();
        assert_eq!(
            courses["CSC108H5F"].description.as_deref(),
            Some("Programming in a language such as Python.")
        );
    }

    #[test]
    fn requirement_text_may_live_in_a_sibling_element() {
        let courses = parse_timetable(TIMETABLE).unwrap();
        let csc148 = &courses["CSC148H5S"];
        assert_eq!(csc148.prerequisites.as_deref(), Some("CSC108H5"));
        assert_eq!(csc148.corequisites.as_deref(), Some("CSC165H5"));
    }

    #[test]
    fn pages_without_course_blocks_parse_to_nothing() {
        let courses = parse_timetable("<html><body><p>maintenance</p></body></html>").unwrap();
        assert!(courses.is_empty());
    }
}
