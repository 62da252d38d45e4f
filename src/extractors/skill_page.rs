//! Skill page extraction
//!
//! A wiki skill page carries its data in a few well-known places under
//! `#bodyContent`: the icon in `.skill-image`, one `li` per stat in
//! `.skill-stats`, an infobox `dl` of alternating `dt`/`dd` entries and the
//! in-game description in a `.noexcerpt` block.

use scraper::{ElementRef, Html};
use tracing::warn;
use url::Url;

use super::css_extractor::{child_elements, element_text, leading_text, select_all, select_first};
use crate::error::{Error, Result};
use crate::normalize::collapse_whitespace;
use crate::record::{ScrapedSkill, SkillInfo, Stat};

const BODY_CONTENT: &str = "#bodyContent";
const ICON: &str = ".skill-image img";
const STAT_LIST: &str = ".skill-stats";
const STAT_LINE: &str = ".skill-stats li";
const INFOBOX: &str = ".infobox dl";
const DESCRIPTION: &str = "#mw-content-text .mw-parser-output .noexcerpt";

/// Extract a skill from a fetched page.
///
/// `page_url` is only used in error messages; relative icon paths are
/// resolved against `base_url`.
pub fn extract_skill(html: &str, id: &str, page_url: &str, base_url: &Url) -> Result<ScrapedSkill> {
    let document = Html::parse_document(html);
    let page = Page { url: page_url, id };

    let root = page.require(select_first(document.root_element(), BODY_CONTENT)?, BODY_CONTENT)?;

    let icon_url = page.icon_url(root, base_url)?;
    let stats = page.stats(root)?;
    let skill_infos = page.skill_infos(root)?;
    let description = page.description(root)?;

    Ok(ScrapedSkill {
        id: id.to_string(),
        icon_url,
        skill_infos,
        stats,
        description,
    })
}

struct Page<'p> {
    url: &'p str,
    id: &'p str,
}

impl Page<'_> {
    fn require<'a>(&self, element: Option<ElementRef<'a>>, what: &str) -> Result<ElementRef<'a>> {
        element.ok_or_else(|| Error::extraction(self.url, format!("missing {what}")))
    }

    fn icon_url(&self, root: ElementRef<'_>, base_url: &Url) -> Result<String> {
        let img = self.require(select_first(root, ICON)?, ICON)?;
        let src = img
            .value()
            .attr("src")
            .ok_or_else(|| Error::extraction(self.url, "icon image has no src"))?;
        let absolute = base_url
            .join(src)
            .map_err(|e| Error::extraction(self.url, format!("bad icon path {src:?}: {e}")))?;
        Ok(absolute.to_string())
    }

    fn stats(&self, root: ElementRef<'_>) -> Result<Vec<Stat>> {
        self.require(select_first(root, STAT_LIST)?, STAT_LIST)?;

        let mut stats = Vec::new();
        for (position, line) in select_all(root, STAT_LINE)?.into_iter().enumerate() {
            let value = leading_text(line);
            let key = select_first(line, "a")?
                .and_then(|a| a.value().attr("title"))
                .map(str::to_string);

            match (key, value) {
                (Some(key), Some(value)) => stats.push(Stat::new(key, value)),
                _ => warn!(id = self.id, url = self.url, position, "skipping malformed stat line"),
            }
        }
        Ok(stats)
    }

    fn skill_infos(&self, root: ElementRef<'_>) -> Result<Vec<SkillInfo>> {
        let dl = self.require(select_first(root, INFOBOX)?, INFOBOX)?;
        let cells: Vec<String> = child_elements(dl).map(element_text).collect();

        // The last dt/dd pair is the page identifier, not a skill attribute
        let pair_end = cells.len().saturating_sub(2);
        let infos = (0..pair_end)
            .step_by(2)
            .map(|i| SkillInfo::new(cells[i].replace(' ', ""), cells[i + 1].clone()))
            .collect();
        Ok(infos)
    }

    fn description(&self, root: ElementRef<'_>) -> Result<String> {
        let block = self.require(select_first(root, DESCRIPTION)?, DESCRIPTION)?;
        Ok(collapse_whitespace(&block.text().collect::<String>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIND_BLAST: &str = r#"
    <html>
    <body>
    <div id="bodyContent">
        <div id="mw-content-text">
        <div class="mw-parser-output">
            <div class="infobox skill-infobox">
                <div class="skill-image"><img src="/images/4/4e/Mind_Blast.jpg" alt="Mind Blast"></div>
                <dl>
                    <dt>Campaign</dt><dd>Core</dd>
                    <dt>Profession</dt><dd>Elementalist</dd>
                    <dt>Attribute</dt><dd>Fire Magic</dd>
                    <dt>Type</dt><dd>Elite Spell</dd>
                    <dt>Skill ID</dt><dd>35</dd>
                </dl>
                <ul class="skill-stats">
                    <li>5<a href="/wiki/Energy" title="Energy"><img src="/e.png"></a></li>
                    <li>1<a href="/wiki/Activation" title="Activation time"><img src="/a.png"></a></li>
                    <li><a href="/wiki/Broken" title="Broken"></a></li>
                    <li>8<a href="/wiki/Recharge" title="Recharge time"><img src="/r.png"></a></li>
                </ul>
            </div>
            <p class="noexcerpt">Elite Spell. Target foe takes 15...71 fire damage.
            If you have more Energy than target foe, you gain 2 Energy.</p>
        </div>
        </div>
    </div>
    </body>
    </html>
    "#;

    fn base() -> Url {
        Url::parse("https://wiki.example").unwrap()
    }

    #[test]
    fn test_extract_full_page() {
        let skill = extract_skill(MIND_BLAST, "35", "https://wiki.example/wiki/Mind_Blast", &base()).unwrap();

        assert_eq!(skill.id, "35");
        assert_eq!(skill.icon_url, "https://wiki.example/images/4/4e/Mind_Blast.jpg");
        assert_eq!(
            skill.skill_infos,
            vec![
                SkillInfo::new("Campaign", "Core"),
                SkillInfo::new("Profession", "Elementalist"),
                SkillInfo::new("Attribute", "Fire Magic"),
                SkillInfo::new("Type", "Elite Spell"),
            ]
        );
        assert_eq!(
            skill.stats,
            vec![
                Stat::new("Energy", "5"),
                Stat::new("Activation time", "1"),
                Stat::new("Recharge time", "8"),
            ]
        );
        assert_eq!(
            skill.description,
            "Elite Spell. Target foe takes 15...71 fire damage. If you have more Energy than target foe, you gain 2 Energy."
        );
    }

    #[test]
    fn test_info_keys_lose_spaces() {
        let html = r#"<div id="bodyContent"><div id="mw-content-text"><div class="mw-parser-output">
            <div class="infobox"><div class="skill-image"><img src="https://cdn.example/x.jpg"></div>
            <dl><dt>Energy cost</dt><dd>10</dd><dt>Skill ID</dt><dd>1</dd></dl>
            <ul class="skill-stats"></ul></div>
            <div class="noexcerpt">Text</div></div></div></div>"#;
        let skill = extract_skill(html, "1", "u", &base()).unwrap();
        assert_eq!(skill.skill_infos, vec![SkillInfo::new("Energycost", "10")]);
        assert_eq!(skill.icon_url, "https://cdn.example/x.jpg");
        assert!(skill.stats.is_empty());
    }

    #[test]
    fn test_missing_icon_fails() {
        let html = MIND_BLAST.replace("skill-image", "skill-picture");
        let err = extract_skill(&html, "35", "https://wiki.example/wiki/Mind_Blast", &base()).unwrap_err();
        match err {
            Error::Extraction { url, reason } => {
                assert_eq!(url, "https://wiki.example/wiki/Mind_Blast");
                assert!(reason.contains(ICON));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_stat_list_fails() {
        let html = MIND_BLAST.replace("skill-stats", "skill-numbers");
        let err = extract_skill(&html, "35", "u", &base()).unwrap_err();
        assert!(matches!(err, Error::Extraction { ref reason, .. } if reason.contains(STAT_LIST)));
    }

    #[test]
    fn test_missing_description_fails() {
        let html = MIND_BLAST.replace("noexcerpt", "excerpt");
        assert!(extract_skill(&html, "35", "u", &base()).is_err());
    }

    #[test]
    fn test_not_a_skill_page() {
        let err = extract_skill("<html><body>404</body></html>", "35", "u", &base()).unwrap_err();
        assert!(matches!(err, Error::Extraction { ref reason, .. } if reason.contains(BODY_CONTENT)));
    }
}
