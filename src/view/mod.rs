use futures::future::{AbortHandle, AbortRegistration, Abortable};
use serde_json::Value;

use crate::api::{ApiClient, ApiError};
use crate::display::DisplayContext;
use crate::entity::{Entity, ForeignKeyField};
use crate::filter::{self, SearchSpec};
use crate::notify::{Notice, Notifier};
use crate::pagination::{self, PageWindow};
use crate::resolver::{RelatedEntityCache, RelatedEntityResolver};
use crate::screens::ListScreen;
use crate::source::{Collection, ListDataSource, PageParams};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Error { message: String },
}

/// What a finished load meant for the screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadEvent {
    Ready { items: usize },
    Failed { message: String },
    /// 401 from the backend; the caller should send the user to log in.
    SessionExpired,
    /// Superseded by a newer load and discarded.
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageChange {
    Rederived,
    NeedsLoad,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Create(Value),
    Update { id: String, body: Value },
    Delete { id: String },
}

impl Mutation {
    fn verb(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "created",
            Mutation::Update { .. } => "updated",
            Mutation::Delete { .. } => "deleted",
        }
    }
}

struct Loaded {
    items: Vec<Entity>,
    total_pages: Option<usize>,
    related: RelatedEntityCache,
}

/// A load detached from the view model so it can run without borrowing it.
///
/// Obtained from [`ListViewModel::begin_load`], driven with [`LoadRequest::run`]
/// and handed back through [`ListViewModel::complete`].
pub struct LoadRequest {
    generation: u64,
    params: Option<PageParams>,
    collection: Collection,
    foreign_keys: Vec<ForeignKeyField>,
    rate_limit: u32,
    registration: AbortRegistration,
}

pub struct LoadOutcome {
    generation: u64,
    // None when the load was aborted before it finished
    result: Option<Result<Loaded, ApiError>>,
}

impl LoadRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> Option<PageParams> {
        self.params
    }

    pub async fn run<C: ApiClient + ?Sized>(self, api: &C) -> LoadOutcome {
        let LoadRequest {
            generation,
            params,
            collection,
            foreign_keys,
            rate_limit,
            registration,
        } = self;

        let work = async {
            let page = ListDataSource::new(api, &collection).fetch(params).await?;
            let related = RelatedEntityResolver::new(api)
                .with_rate_limit(rate_limit)
                .resolve(&page.items, &foreign_keys)
                .await?;
            Ok::<_, ApiError>(Loaded {
                items: page.items,
                total_pages: page.total_pages,
                related,
            })
        };

        LoadOutcome {
            generation,
            result: Abortable::new(work, registration).await.ok(),
        }
    }
}

/// State of one list screen: the loaded entities, their related entities,
/// the search spec and the page being shown.
pub struct ListViewModel {
    screen: ListScreen,
    state: LoadState,
    items: Vec<Entity>,
    related: RelatedEntityCache,
    server_total_pages: Option<usize>,
    search: SearchSpec,
    page: usize,
    page_size: usize,
    rate_limit: u32,
    generation: u64,
    in_flight: Option<AbortHandle>,
    filtered: Vec<Entity>,
    window: PageWindow,
}

impl ListViewModel {
    pub fn new(screen: ListScreen) -> Self {
        let page_size = screen.page_size.max(1);
        Self {
            screen,
            state: LoadState::Idle,
            items: Vec::new(),
            related: RelatedEntityCache::default(),
            server_total_pages: None,
            search: SearchSpec::default(),
            page: 1,
            page_size,
            rate_limit: 0,
            generation: 0,
            in_flight: None,
            filtered: Vec::new(),
            window: pagination::compute_window(0, page_size, 1),
        }
    }

    /// Caps related-entity lookups per second; zero is unlimited.
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limit = per_second;
        self
    }

    pub fn screen(&self) -> &ListScreen {
        &self.screen
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn search(&self) -> &SearchSpec {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn related(&self) -> &RelatedEntityCache {
        &self.related
    }

    fn server_paginated(&self) -> bool {
        self.screen.collection.server_paginated
    }

    /// Rows for the current page after filtering. Empty after a failed load.
    pub fn visible_rows(&self) -> &[Entity] {
        if self.server_paginated() {
            return &self.filtered;
        }
        &self.filtered[self.window.range()]
    }

    pub fn display_context(&self) -> DisplayContext<'_> {
        DisplayContext {
            foreign_keys: &self.screen.foreign_keys,
            related: &self.related,
            labels: &self.screen.labels,
        }
    }

    /// Enters `Loading` and hands out the request to run. Any load still in
    /// flight is aborted and its outcome will be discarded.
    pub fn begin_load(&mut self) -> LoadRequest {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        self.generation += 1;
        self.state = LoadState::Loading;

        let (handle, registration) = AbortHandle::new_pair();
        self.in_flight = Some(handle);

        let params = if self.server_paginated() {
            Some(PageParams {
                page: self.page,
                limit: self.page_size,
            })
        } else {
            None
        };
        LoadRequest {
            generation: self.generation,
            params,
            collection: self.screen.collection.clone(),
            foreign_keys: self.screen.foreign_keys.clone(),
            rate_limit: self.rate_limit,
            registration,
        }
    }

    pub fn complete(&mut self, outcome: LoadOutcome) -> LoadEvent {
        if outcome.generation != self.generation {
            tracing::debug!(
                generation = outcome.generation,
                latest = self.generation,
                "discarding stale load"
            );
            return LoadEvent::Stale;
        }
        self.in_flight = None;

        match outcome.result {
            None => LoadEvent::Stale,
            Some(Ok(loaded)) => {
                self.items = loaded.items;
                self.related = loaded.related;
                self.server_total_pages = loaded.total_pages;
                self.state = LoadState::Ready;
                self.rederive();
                tracing::info!(
                    screen = %self.screen.name,
                    items = self.items.len(),
                    "list loaded"
                );
                LoadEvent::Ready {
                    items: self.items.len(),
                }
            }
            Some(Err(ApiError::Auth)) => {
                self.state = LoadState::Idle;
                LoadEvent::SessionExpired
            }
            Some(Err(e)) => {
                let message = format!("cannot load {}: {e}", self.screen.title.to_lowercase());
                tracing::warn!(screen = %self.screen.name, error = %e, "list load failed");
                self.clear_rows();
                self.state = LoadState::Error {
                    message: message.clone(),
                };
                LoadEvent::Failed { message }
            }
        }
    }

    pub async fn load<C: ApiClient + ?Sized>(&mut self, api: &C) -> LoadEvent {
        let request = self.begin_load();
        let outcome = request.run(api).await;
        self.complete(outcome)
    }

    pub async fn retry<C: ApiClient + ?Sized>(&mut self, api: &C) -> LoadEvent {
        self.load(api).await
    }

    /// Re-filters what is already loaded; never touches the network.
    pub fn set_search(&mut self, search: SearchSpec) {
        self.search = search;
        self.rederive();
    }

    pub fn set_page(&mut self, page: usize) -> PageChange {
        if self.server_paginated() {
            self.page = match self.server_total_pages {
                Some(total) => pagination::clamp_page(page, total),
                None => page.max(1),
            };
            return PageChange::NeedsLoad;
        }
        self.page = page;
        self.rederive();
        PageChange::Rederived
    }

    pub fn set_page_size(&mut self, page_size: usize) -> PageChange {
        self.page_size = page_size.max(1);
        if self.server_paginated() {
            self.page = 1;
            return PageChange::NeedsLoad;
        }
        self.rederive();
        PageChange::Rederived
    }

    /// Runs a create/update/delete and refetches on success. On failure the
    /// list is left exactly as it was and the error is reported as a notice.
    pub async fn mutate<C: ApiClient + ?Sized>(
        &mut self,
        api: &C,
        mutation: Mutation,
        notifier: &dyn Notifier,
    ) -> Result<LoadEvent, ApiError> {
        let verb = mutation.verb();
        let source = ListDataSource::new(api, &self.screen.collection);
        let result = match mutation {
            Mutation::Create(body) => source.create(body).await,
            Mutation::Update { id, body } => source.update(&id, body).await,
            Mutation::Delete { id } => source.delete(&id).await,
        };
        match result {
            Ok(_) => {
                notifier.notify(Notice::success(format!(
                    "{}: record {verb}",
                    self.screen.title
                )));
                Ok(self.load(api).await)
            }
            // no notice: the caller sends the user to log in
            Err(ApiError::Auth) => Err(ApiError::Auth),
            Err(e) => {
                notifier.notify(Notice::error(format!(
                    "{}: record not {verb}: {e}",
                    self.screen.title
                )));
                Err(e)
            }
        }
    }

    fn rederive(&mut self) {
        let filtered = {
            let ctx = self.display_context();
            filter::filter(&self.items, &self.search, &ctx)
        };
        self.filtered = filtered;

        self.window = if self.server_paginated() {
            let total = if self.filtered.is_empty() {
                0
            } else {
                self.server_total_pages.unwrap_or(self.page)
            };
            let current = pagination::clamp_page(self.page, total);
            PageWindow {
                first_index: 0,
                last_index: self.filtered.len(),
                total_pages: total,
                current_page: current,
                page_numbers: pagination::page_numbers(total, current),
            }
        } else {
            pagination::compute_window(self.filtered.len(), self.page_size, self.page)
        };
        // an empty server page says nothing about which page was asked for
        if !(self.server_paginated() && self.filtered.is_empty()) {
            self.page = self.window.current_page;
        }
    }

    // drops the previous load's rows but keeps the requested page for retry
    fn clear_rows(&mut self) {
        self.items.clear();
        self.filtered.clear();
        self.related = RelatedEntityCache::default();
        self.server_total_pages = None;
        self.window = pagination::compute_window(0, self.page_size, 1);
    }
}
