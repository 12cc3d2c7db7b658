//! Traversal engine - recursive harvest orchestration
//!
//! This module contains the depth-first walk that turns one crawl root into a
//! single composite document:
//! - Fetching and cleaning each page through the site profile
//! - Suppressing repeated navigation widgets and fragments
//! - Saving images into the content-addressed store
//! - Embedding linked pages in place of the anchors that point to them
//! - Writing the root document, then its navigation entries, to the root's artifact

use crate::config::Config;
use crate::crawler::embed::embed;
use crate::crawler::hasher::fragment_hash;
use crate::crawler::{Fetcher, HttpFetcher, ImageHarvester, SelectorProfile, SiteProfile};
use crate::document::{Converted, ElementNode, Node};
use crate::output::{flatten, root_content, ArtifactEntry, ArtifactWriter, HarvestStats};
use crate::state::{CrawlContext, PageOutcome, RecheckPolicy};
use crate::url::{is_same_page, resolve_link, visit_key, DomainScope};
use crate::Result;
use scraper::Html;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tracing::{debug, info, warn};
use url::Url;

/// A fetched and resolved page
#[derive(Debug, Clone)]
struct HarvestedPage {
    title: String,
    tree: Node,
}

/// The URL a page was requested as, and the URL it was served from
struct PageUrls<'a> {
    requested: &'a Url,
    served: &'a Url,
}

/// Recursive knowledge-base harvester
pub struct Harvester<F = HttpFetcher, P = SelectorProfile> {
    config: Config,
    fetcher: F,
    profile: P,
    scope: DomainScope,
    images: Option<ImageHarvester>,
    output_dir: PathBuf,
}

impl Harvester<HttpFetcher, SelectorProfile> {
    /// Builds the HTTP harvester and logs in when `[auth]` is configured
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError::Authentication)` - Login rejected; nothing was fetched
    pub async fn connect(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        if let Some(auth) = &config.auth {
            fetcher.authenticate(auth).await?;
        }

        let profile = SelectorProfile::from_config(&config.selectors)?;
        let images = config
            .images
            .enabled
            .then(|| ImageHarvester::new(fetcher.client().clone(), &config.images));

        Ok(Self::new(config, fetcher, profile, images))
    }
}

impl<F: Fetcher, P: SiteProfile> Harvester<F, P> {
    pub fn new(config: Config, fetcher: F, profile: P, images: Option<ImageHarvester>) -> Self {
        let scope = DomainScope::new(&config.scope.allowed_domains);
        let output_dir = PathBuf::from(&config.output.directory);
        Self {
            config,
            fetcher,
            profile,
            scope,
            images,
            output_dir,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The artifact a crawl root's entries are appended to
    pub fn artifact_for(&self, root: &Url) -> ArtifactWriter {
        ArtifactWriter::for_root(&self.output_dir, root)
    }

    /// Empties the artifact of every configured crawl root
    pub fn truncate_artifacts(&self) -> Result<()> {
        for root in &self.config.harvest.roots {
            let url = root_url(root)?;
            self.artifact_for(&url).truncate()?;
        }
        Ok(())
    }

    /// A fresh context using the configured re-check policy
    pub fn new_context(&self) -> CrawlContext {
        let policy = match self.config.harvest.recheck_duplicates_below_depth {
            Some(depth) => RecheckPolicy::below(depth),
            None => RecheckPolicy::never(),
        };
        CrawlContext::new(policy)
    }

    /// Harvests every configured crawl root in order
    ///
    /// Only artifact I/O errors abort the run; page and image failures are
    /// logged and skipped.
    pub async fn run(&self) -> Result<HarvestStats> {
        let mut ctx = self.new_context();

        for (index, root) in self.config.harvest.roots.iter().enumerate() {
            if index > 0 && self.config.harvest.reset_visited_per_root {
                ctx.reset();
            }

            let url = match root_url(root) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping crawl root {}: {}", root, e);
                    continue;
                }
            };

            self.harvest_root(&mut ctx, &url).await?;
        }

        let mut stats = ctx.into_stats();
        stats.finish();
        info!(
            "Harvest finished: {} roots, {} pages fetched, {} embedded",
            stats.roots, stats.pages_fetched, stats.pages_embedded
        );
        Ok(stats)
    }

    /// Harvests one crawl root into its own artifact
    ///
    /// The root entry is written first, followed by the navigation entries
    /// produced while resolving it. Returns false if the root itself produced
    /// no content.
    pub async fn harvest_root(&self, ctx: &mut CrawlContext, url: &Url) -> Result<bool> {
        info!("Harvesting crawl root {}", url);
        ctx.stats_mut().roots += 1;

        let page = self.visit(ctx, url, 0).await;
        let side_entries = ctx.take_entries();
        let artifact = self.artifact_for(url);

        let Some(page) = page else {
            warn!("Crawl root {} produced no content", url);
            artifact.append_all(&side_entries)?;
            ctx.stats_mut().entries_written += side_entries.len() as u64;
            return Ok(false);
        };

        let mut entries = Vec::with_capacity(side_entries.len() + 1);
        entries.push(ArtifactEntry::new(
            page.title,
            url.as_str(),
            root_content(url.as_str(), &flatten(&page.tree)),
        ));
        entries.extend(side_entries);

        artifact.append_all(&entries)?;
        debug!(
            "Wrote {} entries to {}",
            entries.len(),
            artifact.path().display()
        );
        ctx.stats_mut().entries_written += entries.len() as u64;
        Ok(true)
    }

    /// Fetches `url` at `depth` and returns its resolved content tree
    ///
    /// Returns None when the page is too deep, already visited, fails to
    /// fetch, or has no content root. Navigation entries found on the way are
    /// left queued in `ctx`.
    pub async fn process_page(&self, ctx: &mut CrawlContext, url: &Url, depth: u32) -> Option<Node> {
        self.visit(ctx, url, depth).await.map(|page| page.tree)
    }

    async fn visit(&self, ctx: &mut CrawlContext, url: &Url, depth: u32) -> Option<HarvestedPage> {
        if depth > self.config.harvest.max_depth {
            debug!("Depth {} exceeds maximum for {}", depth, url);
            ctx.record(PageOutcome::DepthExceeded);
            return None;
        }

        if !ctx.try_mark_visited(&visit_key(url), depth) {
            debug!("Already visited {}", url);
            ctx.record(PageOutcome::AlreadyVisited);
            return None;
        }

        let (served, title, converted) = self.fetch_and_clean(ctx, url).await?;
        let urls = PageUrls {
            requested: url,
            served: &served,
        };

        let navigation = self.queue_navigation(ctx, converted.navigation, &served);

        let mut tree = converted.content;
        if self.config.harvest.dedup_fragments {
            self.suppress_fragments(ctx, &mut tree, &served);
        }

        let mut tree = self.harvest_images(ctx, tree, &served).await;

        if let Some(root) = tree.as_element_mut() {
            self.resolve_children(ctx, root, &urls, depth).await;
        }

        self.expand_navigation(ctx, &title, &urls, navigation, depth)
            .await;

        Some(HarvestedPage { title, tree })
    }

    /// Fetches a page and runs it through the site profile
    async fn fetch_and_clean(
        &self,
        ctx: &mut CrawlContext,
        url: &Url,
    ) -> Option<(Url, String, Converted)> {
        let result = self.fetcher.fetch(url).await;
        if !result.is_ok() {
            warn!("Failed to fetch {}: {}", url, result.describe());
            ctx.record(PageOutcome::FetchFailed);
            return None;
        }
        let (served, body) = result.into_body()?;
        ctx.record(PageOutcome::Fetched);
        debug!("Fetched {} ({} bytes)", served, body.len());

        match self.clean(&body, &served) {
            Some((title, converted)) => {
                let title = title.unwrap_or_else(|| url.to_string());
                Some((served, title, converted))
            }
            None => {
                warn!("No content root found on {}", served);
                ctx.record(PageOutcome::NoContent);
                None
            }
        }
    }

    /// Parses markup; the parsed document never lives across an await
    fn clean(&self, body: &str, page_url: &Url) -> Option<(Option<String>, Converted)> {
        let document = Html::parse_document(body);
        let converted = self.profile.clean_content(&document, page_url)?;
        Some((self.profile.title(&document), converted))
    }

    /// Keeps the widgets whose link set has not been seen in this context
    ///
    /// A widget without links has no key and is never treated as a duplicate.
    fn queue_navigation(&self, ctx: &mut CrawlContext, widgets: Vec<Node>, base: &Url) -> Vec<Node> {
        widgets
            .into_iter()
            .filter(|widget| match fragment_hash(widget, base) {
                Some(hash) => ctx.record_navigation(hash),
                None => true,
            })
            .collect()
    }

    /// Removes fragment-marked subtrees whose link set was already seen
    fn suppress_fragments(&self, ctx: &mut CrawlContext, tree: &mut Node, base: &Url) {
        let mut suppressed = 0;
        tree.retain(&mut |node: &Node| {
            let is_fragment = node.as_element().is_some_and(|e| e.fragment);
            if !is_fragment {
                return false;
            }
            match fragment_hash(node, base) {
                Some(hash) if !ctx.record_fragment(hash) => {
                    suppressed += 1;
                    true
                }
                _ => false,
            }
        });

        for _ in 0..suppressed {
            ctx.record(PageOutcome::FragmentSuppressed);
        }
        if suppressed > 0 {
            debug!("Suppressed {} repeated fragments on {}", suppressed, base);
        }
    }

    async fn harvest_images(&self, ctx: &mut CrawlContext, tree: Node, base: &Url) -> Node {
        let Some(images) = &self.images else {
            return tree;
        };
        let (tree, report) = images.harvest(tree, base, ctx.images_mut()).await;
        ctx.stats_mut().record_images(&report);
        tree
    }

    /// Embeds every followable link below `element`, in document order
    ///
    /// An element whose own target yields nothing is descended into, so
    /// nested index items below a failed one are still reached.
    fn resolve_children<'a>(
        &'a self,
        ctx: &'a mut CrawlContext,
        element: &'a mut ElementNode,
        urls: &'a PageUrls<'a>,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
        Box::pin(async move {
            for index in 0..element.children.len() {
                let target = match element.children[index].as_element() {
                    Some(child) => self.link_target(child, urls),
                    None => continue,
                };

                if let Some(target) = target {
                    if let Some(page) = self.visit(ctx, &target, depth + 1).await {
                        embed(element, index, page.tree, &target);
                        ctx.record(PageOutcome::Embedded);
                        continue;
                    }
                }

                if let Some(child) = element.children[index].as_element_mut() {
                    self.resolve_children(ctx, child, urls, depth).await;
                }
            }
        })
    }

    /// The page an element links to, if the engine may follow it
    fn link_target(&self, element: &ElementNode, urls: &PageUrls<'_>) -> Option<Url> {
        if element.no_follow {
            return None;
        }

        let href = if element.is("a") {
            element
                .attr("href")
                .and_then(|href| resolve_link(href, urls.served))
        } else {
            None
        };
        let mut target = href.or_else(|| self.profile.extra_link(element))?;
        target.set_fragment(None);

        if !self.scope.permits(&target) {
            return None;
        }
        if is_same_page(&target, urls.requested) || is_same_page(&target, urls.served) {
            return None;
        }
        Some(target)
    }

    /// Queues the widgets as entries and expands their targets
    async fn expand_navigation(
        &self,
        ctx: &mut CrawlContext,
        title: &str,
        urls: &PageUrls<'_>,
        widgets: Vec<Node>,
        depth: u32,
    ) {
        for widget in widgets {
            ctx.queue_entry(ArtifactEntry::new(
                format!("Navigation: {}", title),
                urls.requested.as_str(),
                flatten(&widget),
            ));
            ctx.record(PageOutcome::NavigationEmitted);

            let targets: Vec<Url> = widget
                .find_all("a")
                .into_iter()
                .filter_map(|anchor| anchor.attr("href"))
                .filter_map(|href| resolve_link(href, urls.served))
                .map(|mut url| {
                    url.set_fragment(None);
                    url
                })
                .collect();

            for target in targets {
                self.expand_side_channel(ctx, target, urls, depth).await;
            }
        }
    }

    /// Harvests a navigation target at the current depth as its own entry
    ///
    /// The target is processed like any page: its links are embedded one level
    /// deeper and its own widgets are queued. The result is never spliced into
    /// the page the widget came from.
    fn expand_side_channel<'a>(
        &'a self,
        ctx: &'a mut CrawlContext,
        target: Url,
        origin: &'a PageUrls<'a>,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = ()> + 'a>> {
        Box::pin(async move {
            if !self.scope.permits(&target)
                || is_same_page(&target, origin.requested)
                || is_same_page(&target, origin.served)
            {
                return;
            }

            let Some(page) = self.visit(ctx, &target, depth).await else {
                return;
            };

            debug!("Expanded navigation target {}", target);
            ctx.queue_entry(ArtifactEntry::new(
                page.title,
                target.as_str(),
                flatten(&page.tree),
            ));
            ctx.record(PageOutcome::NavigationExpanded);
        })
    }
}

/// A configured crawl root as it is fetched: parsed, without its fragment
fn root_url(root: &str) -> Result<Url> {
    let mut url = Url::parse(root)?;
    url.set_fragment(None);
    Ok(url)
}
