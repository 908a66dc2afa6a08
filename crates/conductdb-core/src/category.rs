//! The closed set of conduct categories and a fixed per-category vector.

use serde::{Deserialize, Serialize};

/// Conduct category an event or score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Labor,
    Environment,
    Politics,
    Social,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 4] = [
        Category::Labor,
        Category::Environment,
        Category::Politics,
        Category::Social,
    ];

    /// Bucket used for any label that does not map to a known category.
    pub const DEFAULT_BUCKET: Category = Category::Social;

    /// Map an arbitrary upstream label onto a canonical category.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace,
    /// hyphens and underscores. Unrecognised labels (including the empty
    /// string) fall into [`Category::DEFAULT_BUCKET`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let key: String = label
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "labor" | "labour" | "workers" | "worker" | "employment" | "workplace"
            | "humanrights" | "wages" => Category::Labor,
            "environment" | "environmental" | "climate" | "sustainability" | "emissions"
            | "pollution" | "planet" => Category::Environment,
            "politics" | "political" | "policy" | "lobbying" | "donations" | "government" => {
                Category::Politics
            }
            _ => Category::DEFAULT_BUCKET,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Labor => "labor",
            Category::Environment => "environment",
            Category::Politics => "politics",
            Category::Social => "social",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per [`Category`], serialized as an object keyed by category name.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerCategory<T> {
    #[serde(default)]
    pub labor: T,
    #[serde(default)]
    pub environment: T,
    #[serde(default)]
    pub politics: T,
    #[serde(default)]
    pub social: T,
}

impl<T> PerCategory<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            labor: f(Category::Labor),
            environment: f(Category::Environment),
            politics: f(Category::Politics),
            social: f(Category::Social),
        }
    }

    #[must_use]
    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Labor => &self.labor,
            Category::Environment => &self.environment,
            Category::Politics => &self.politics,
            Category::Social => &self.social,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut T {
        match category {
            Category::Labor => &mut self.labor,
            Category::Environment => &mut self.environment,
            Category::Politics => &mut self.politics,
            Category::Social => &mut self.social,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Category, &T) -> U) -> PerCategory<U> {
        PerCategory::from_fn(|c| f(c, self.get(c)))
    }
}

impl<T: Clone> PerCategory<T> {
    pub fn uniform(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}
