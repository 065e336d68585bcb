//! Filter, sort and paginate the cache into the visible resource list.
//!
//! Everything here is a pure function of its inputs. Callers re-run
//! [`render`] after every sync instead of holding on to an old page.

use crate::query::sort::{Column, SortStack};
use crate::resource::types::Resource;
use crate::sync::engine::Cache;
use crate::taxonomy::index::TaxonomyIndex;

use std::collections::HashSet;

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Labels that mean "no category filter"
const ROOT_LABELS: [&str; 2] = ["resources", "all resources"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String)
}

impl CategoryFilter {
    /// Empty input and the root labels select everything
    pub fn parse(label: &str) -> CategoryFilter {
        let trimmed = label.trim();
        if trimmed.is_empty() || ROOT_LABELS.contains(&trimmed.to_lowercase().as_str()) {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(trimmed.to_string())
        }
    }

    /// Lower-cased labels a resource type must be in, `None` for no filter
    pub fn accepted_types(&self, taxonomy: &TaxonomyIndex) -> Option<HashSet<String>> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Category(label) => {
                let mut accepted: HashSet<String> = taxonomy.descendants_of(label).into_iter()
                    .map(|l| l.to_lowercase())
                    .collect();
                accepted.insert(label.to_lowercase());
                Some(accepted)
            }
        }
    }
}

/// Category and search filters, applied together
pub fn filter<'a, I>(resources: I, search: &str, category: &CategoryFilter, taxonomy: &TaxonomyIndex) -> Vec<&'a Resource>
        where I: IntoIterator<Item = &'a Resource> {
    let accepted = category.accepted_types(taxonomy);
    let term = search.trim().to_lowercase();

    resources.into_iter()
        .filter(|r| accepted.as_ref().map_or(true, |set| set.contains(&r.resource_type.to_lowercase())))
        .filter(|r| term.is_empty()
            || r.name.to_lowercase().contains(&term)
            || r.resource_type.to_lowercase().contains(&term))
        .collect()
}

/// Stable multi-key sort; full ties keep their input order
pub fn sort_by(resources: &mut [&Resource], sort: &SortStack) {
    resources.sort_by(|a, b| sort.compare(a, b));
}

/// Filtered and sorted view of the whole cache
pub fn render<'a>(cache: &'a Cache, search: &str, category: &CategoryFilter,
        sort: &SortStack, taxonomy: &TaxonomyIndex) -> Vec<&'a Resource> {
    let mut list = filter(cache.iter(), search, category, taxonomy);
    sort_by(&mut list, sort);
    list
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub page: usize,
    pub page_count: usize,
    /// Number of results across all pages
    pub total: usize
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.page >= self.page_count
    }
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Slices out one page. The page number is clamped to `[1, page_count]`, so
/// an empty result is page 1 of 0.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page_count = page_count(items.len(), page_size);
    let page = page.clamp(1, page_count.max(1));
    let start = (page - 1) * page_size;
    let end = start.saturating_add(page_size).min(items.len());

    Page {
        items: items.get(start..end).map(|s| s.to_vec()).unwrap_or_default(),
        page,
        page_count,
        total: items.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageNav {
    First,
    Prev,
    Next,
    Last,
    Number(usize)
}

/// What the resource view currently shows
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub search: String,
    pub category: CategoryFilter,
    pub sort: SortStack,
    pub page: usize,
    pub page_size: usize
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            search: String::new(),
            category: CategoryFilter::All,
            sort: SortStack::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE
        }
    }
}

impl ViewState {
    pub fn with_page_size(page_size: usize) -> ViewState {
        ViewState { page_size: page_size.max(1), ..Default::default() }
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn select_category(&mut self, label: &str) {
        self.category = CategoryFilter::parse(label);
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn toggle_sort(&mut self, column: Column) {
        self.sort.toggle(column);
    }

    /// Moves to another page given how many results there are now
    pub fn navigate(&mut self, nav: PageNav, total: usize) {
        let last = page_count(total, self.page_size).max(1);
        let target = match nav {
            PageNav::First => 1,
            PageNav::Prev => self.page.saturating_sub(1),
            PageNav::Next => self.page + 1,
            PageNav::Last => last,
            PageNav::Number(n) => n
        };
        self.page = target.clamp(1, last);
    }

    /// The current page of `cache` under this view
    pub fn render_page(&self, cache: &Cache, taxonomy: &TaxonomyIndex) -> Page<Resource> {
        let list = render(cache, &self.search, &self.category, &self.sort, taxonomy);
        let page = paginate(&list, self.page, self.page_size);
        Page {
            items: page.items.into_iter().cloned().collect(),
            page: page.page,
            page_count: page.page_count,
            total: page.total
        }
    }
}
