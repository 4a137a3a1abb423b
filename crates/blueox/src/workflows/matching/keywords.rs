/// Skill label to the keywords searched for in a posting.
const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("Electricians", &["electrician", "electrical", "wiring", "electric"]),
    ("Scaffolders", &["scaffolder", "scaffold", "scaffolding"]),
    ("Mig Welding", &["mig", "welding", "welder", "weld"]),
    ("Mug Welding", &["mug", "welding", "welder", "weld"]),
    ("Carpentry", &["carpenter", "carpentry", "woodwork", "wood"]),
    (
        "Truck Drivers",
        &["truck", "driver", "driving", "lorry", "hgv", "cdl"],
    ),
    (
        "Forklift Drivers",
        &["forklift", "fork lift", "warehouse", "operator"],
    ),
    (
        "Construction Helpers",
        &["construction", "helper", "laborer", "building"],
    ),
    ("Plumbers", &["plumber", "plumbing", "pipe", "pipes"]),
    (
        "HVAC Techs",
        &["hvac", "heating", "cooling", "air conditioning", "ventilation"],
    ),
    (
        "Caregivers",
        &["caregiver", "care", "elderly", "healthcare", "nursing"],
    ),
    (
        "Warehouse Workers",
        &["warehouse", "storage", "logistics", "packing"],
    ),
    ("Ship Building", &["ship", "shipyard", "marine", "vessel", "boat"]),
];

/// Selecting "Any" expresses no preference and never adds to a score.
pub const ANY_SKILL: &str = "Any";

/// Keywords for `skill`. Unknown labels search for themselves, lowercased.
pub fn keywords_for(skill: &str) -> Vec<String> {
    SKILL_KEYWORDS
        .iter()
        .find(|(label, _)| *label == skill)
        .map(|(_, keywords)| keywords.iter().map(|keyword| keyword.to_string()).collect())
        .unwrap_or_else(|| vec![skill.to_lowercase()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_skills_use_the_table() {
        assert_eq!(
            keywords_for("Plumbers"),
            vec!["plumber", "plumbing", "pipe", "pipes"]
        );
    }

    #[test]
    fn unknown_skills_fall_back_to_their_label() {
        assert_eq!(keywords_for("Tile Setting"), vec!["tile setting"]);
    }
}
