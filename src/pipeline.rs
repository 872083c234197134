//! The literature review pipeline.
//!
//! Stages run strictly in order, each on the collection produced by the
//! previous one:
//!
//! 1. load and merge the exports found in the data directory,
//! 2. subtract the exclusion list,
//! 3. refine metadata through a [`MetadataService`],
//! 4. plot descriptive statistics,
//! 5. plot the co-citation network,
//! 6. fit a topic model and tag every document as relevant or not.
//!
//! No stage error escapes its stage: each stage reports a [`StageStatus`]
//! and the pipeline continues with the best collection available. The only
//! fatal condition is a data directory without any loadable document.

use crate::collection::CollectionError;
use crate::config::Config;
use crate::corpus::{Corpus, CorpusError};
use crate::network::build_cocitation_network;
use crate::plot::{
    ArtifactStatus, Figure, OutputPolicy, PlotError, PlotStyle, load_font,
    plot_cocitation_network, plot_histogram, plot_topic_clouds, plot_topic_embedding,
    plot_word_distribution,
};
use crate::refine::MetadataService;
use crate::stats::{
    Groups, Histogram, HistogramOptions, compute_affiliation_histogram,
    compute_author_histogram, compute_country_histogram, compute_language_histogram,
    compute_source_histogram, compute_year_histogram, relevance_by_source, relevance_by_year,
};
use crate::topic::{TopicError, train_nmf_model};
use crate::{BibtexParser, CsvParser, DocumentCollection, DocumentParser, RisParser};
use itertools::Itertools;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Property attached by topic classification.
pub const RELEVANCE_PROPERTY: &str = "is_relevant_topic";

/// Exclusion list, subtracted from the merged sources.
pub const EXCLUSION_FILE: &str = "exclude.ris";

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No documents could be loaded from {}", .0.display())]
    NoSources(PathBuf),
}

/// Errors ending the topic classification stage.
#[derive(Debug, Error)]
enum ClassifyError {
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Topic model error: {0}")]
    Topic(#[from] TopicError),

    #[error("Tagging error: {0}")]
    Collection(#[from] CollectionError),
}

/// Outcome of a stage, a source or a figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    /// Nothing to do
    Skipped(String),
    /// Finished with reduced fidelity
    Degraded(String),
    Failed(String),
}

impl StageStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageStatus::Completed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Completed => f.write_str("completed"),
            StageStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
            StageStatus::Degraded(reason) => write!(f, "degraded ({})", reason),
            StageStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Pipeline stages after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Exclusion,
    Refinement,
    Statistics,
    Network,
    Topics,
}

/// Input format of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    IeeeCsv,
    SpringerCsv,
    Bibtex,
}

impl SourceFormat {
    fn parser(self) -> Box<dyn DocumentParser> {
        match self {
            SourceFormat::IeeeCsv => Box::new(CsvParser::ieee()),
            SourceFormat::SpringerCsv => Box::new(CsvParser::springer()),
            SourceFormat::Bibtex => Box::new(BibtexParser::new()),
        }
    }
}

/// Source files, in merge order.
pub const SOURCES: [(&str, SourceFormat); 3] = [
    ("ieee.csv", SourceFormat::IeeeCsv),
    ("springer.csv", SourceFormat::SpringerCsv),
    ("zotero.bib", SourceFormat::Bibtex),
];

/// Outcome of loading one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub name: String,
    pub path: PathBuf,
    pub status: StageStatus,
    pub count: usize,
}

/// Outcome of one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReport {
    pub filename: String,
    pub status: StageStatus,
}

/// Everything a run did.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub sources: Vec<SourceReport>,
    pub stages: Vec<(Stage, StageStatus)>,
    pub artifacts: Vec<ArtifactReport>,
    pub loaded: usize,
    pub after_exclusion: usize,
    pub after_refinement: usize,
    /// Documents tagged relevant, when classification succeeded
    pub relevant: Option<usize>,
    /// The final, tagged collection
    pub documents: DocumentCollection,
}

impl PipelineReport {
    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, status)| status)
    }

    pub fn artifact(&self, filename: &str) -> Option<&ArtifactReport> {
        self.artifacts.iter().find(|a| a.filename == filename)
    }

    fn record(&mut self, stage: Stage, status: StageStatus) {
        info!("Stage {:?}: {}", stage, status);
        self.stages.push((stage, status));
    }
}

/// Signature shared by the descriptive-statistics histograms.
type HistogramFn = fn(&DocumentCollection, &HistogramOptions) -> Histogram;

/// Drives the stages for one configuration.
pub struct Pipeline {
    config: Config,
    service: Box<dyn MetadataService>,
    policy: OutputPolicy,
    style: PlotStyle,
}

impl Pipeline {
    /// Creates a pipeline; the plot font is loaded here.
    pub fn new(config: Config, service: Box<dyn MetadataService>) -> Self {
        let style = config
            .plot_style()
            .with_text(load_font(config.font.as_deref()));
        let policy = config.output_policy();
        Self {
            config,
            service,
            policy,
            style,
        }
    }

    pub fn with_style(mut self, style: PlotStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_policy(mut self, policy: OutputPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs every stage.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoSources` when no source file yields a
    /// document; no later stage runs in that case.
    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        info!("Reading sources from {}", self.config.data_dir.display());
        let mut report = PipelineReport::default();

        let (documents, sources) = self.load_sources();
        report.sources = sources;
        if documents.is_empty() {
            error!(
                "CRITICAL: no documents could be loaded from {}",
                self.config.data_dir.display()
            );
            return Err(PipelineError::NoSources(self.config.data_dir.clone()));
        }
        report.loaded = documents.len();
        info!("{} documents after merging sources", documents.len());

        if let OutputPolicy::Save { dir } = &self.policy {
            if let Err(e) = std::fs::create_dir_all(dir) {
                error!("Cannot create output directory {}: {}", dir.display(), e);
            }
        }

        let (documents, status) = self.apply_exclusions(&documents);
        report.after_exclusion = documents.len();
        report.record(Stage::Exclusion, status);

        let (documents, status) = self.refine_metadata(&documents);
        report.after_refinement = documents.len();
        report.record(Stage::Refinement, status);

        let (artifacts, status) = self.report_statistics(&documents);
        report.artifacts.extend(artifacts);
        report.record(Stage::Statistics, status);

        let (artifact, status) = self.render_network(&documents);
        report.artifacts.push(artifact);
        report.record(Stage::Network, status);

        let (documents, artifacts, status) = self.classify_topics(&documents);
        report.artifacts.extend(artifacts);
        if status.is_completed() {
            report.relevant = Some(
                documents
                    .iter()
                    .filter(|d| d.flag(RELEVANCE_PROPERTY) == Some(true))
                    .count(),
            );
        }
        report.record(Stage::Topics, status);

        report.documents = documents;
        Ok(report)
    }

    /// Loads every source file and merges them by document identity.
    pub fn load_sources(&self) -> (DocumentCollection, Vec<SourceReport>) {
        let mut merged = DocumentCollection::new();
        let mut reports = Vec::with_capacity(SOURCES.len());

        for (name, format) in SOURCES {
            let path = self.config.data_dir.join(name);
            let (status, count) = if !path.is_file() {
                warn!("Source {} not found, skipping", path.display());
                (StageStatus::Skipped("file not found".to_string()), 0)
            } else {
                match format.parser().parse_file(&path) {
                    Ok(documents) if documents.is_empty() => {
                        warn!("Source {} contains no documents, skipping", path.display());
                        (StageStatus::Skipped("no documents".to_string()), 0)
                    }
                    Ok(documents) => {
                        let count = documents.len();
                        info!("Loaded {} documents from {}", count, name);
                        merged = merged.union(&documents.into());
                        (StageStatus::Completed, count)
                    }
                    Err(e) => {
                        error!("Failed to load {}: {}", path.display(), e);
                        (StageStatus::Failed(e.to_string()), 0)
                    }
                }
            };
            reports.push(SourceReport {
                name: name.to_string(),
                path,
                status,
                count,
            });
        }

        (merged, reports)
    }

    /// Removes the documents listed in the exclusion file, when present.
    pub fn apply_exclusions(
        &self,
        documents: &DocumentCollection,
    ) -> (DocumentCollection, StageStatus) {
        let path = self.config.data_dir.join(EXCLUSION_FILE);
        if !path.is_file() {
            info!("No exclusion list at {}", path.display());
            return (
                documents.clone(),
                StageStatus::Skipped(format!("{} not found", EXCLUSION_FILE)),
            );
        }

        match RisParser::new().parse_file(&path) {
            Ok(excluded) => {
                let excluded = DocumentCollection::from(excluded);
                let remaining = documents.difference(&excluded);
                info!(
                    "Excluded {} of {} listed documents, {} remaining",
                    documents.len() - remaining.len(),
                    excluded.len(),
                    remaining.len()
                );
                (remaining, StageStatus::Completed)
            }
            Err(e) => {
                warn!("Cannot read exclusion list {}: {}", path.display(), e);
                warn!("Continuing without exclusions");
                (documents.clone(), StageStatus::Skipped(e.to_string()))
            }
        }
    }

    /// Refines every document through the metadata service; on failure the
    /// input collection is returned unchanged.
    pub fn refine_metadata(
        &self,
        documents: &DocumentCollection,
    ) -> (DocumentCollection, StageStatus) {
        match self.service.refine(documents) {
            Ok(refinement) => {
                let not_found = refinement.not_found.len();
                let found = refinement.into_found();
                info!(
                    "{} documents found on {}, {} not found",
                    found.len(),
                    self.service.name(),
                    not_found
                );
                (found, StageStatus::Completed)
            }
            Err(e) => {
                warn!("Metadata refinement through {} failed: {}", self.service.name(), e);
                warn!(
                    "Continuing with {} unrefined documents; results may be less accurate",
                    documents.len()
                );
                (documents.clone(), StageStatus::Degraded(e.to_string()))
            }
        }
    }

    /// Plots the descriptive-statistics histograms, each independently.
    pub fn report_statistics(
        &self,
        documents: &DocumentCollection,
    ) -> (Vec<ArtifactReport>, StageStatus) {
        let limit = HistogramOptions::limit(self.config.settings.bar_limit);
        let plots: [(HistogramFn, HistogramOptions, &str); 6] = [
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_year_histogram(d, o),
                HistogramOptions::default(),
                "year_histogram.png",
            ),
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_affiliation_histogram(d, o),
                limit.clone(),
                "affiliation_histogram.png",
            ),
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_author_histogram(d, o),
                limit.clone(),
                "author_histogram.png",
            ),
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_language_histogram(d, o),
                HistogramOptions::default(),
                "language_histogram.png",
            ),
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_country_histogram(d, o),
                limit.clone(),
                "country_histogram.png",
            ),
            (
                |d: &DocumentCollection, o: &HistogramOptions| compute_source_histogram(d, o),
                limit,
                "source_histogram.png",
            ),
        ];

        let artifacts: Vec<ArtifactReport> = plots
            .into_iter()
            .map(|(compute, options, filename)| {
                let histogram = compute(documents, &options);
                self.emit(plot_histogram(&histogram, &self.style), filename)
            })
            .collect();

        let failed = artifacts.iter().filter(|a| !a.status.is_completed()).count();
        let status = if failed == 0 {
            StageStatus::Completed
        } else {
            StageStatus::Degraded(format!("{} of {} plots failed", failed, artifacts.len()))
        };
        (artifacts, status)
    }

    /// Builds and plots the co-citation network.
    pub fn render_network(
        &self,
        documents: &DocumentCollection,
    ) -> (ArtifactReport, StageStatus) {
        let filename = "cocitation_network.png";
        let max_edges = self.config.settings.max_network_edges;
        let network = match build_cocitation_network(documents, max_edges) {
            Ok(network) => network,
            Err(e) => {
                error!("Cannot build the co-citation network: {}", e);
                let status = StageStatus::Failed(e.to_string());
                return (
                    ArtifactReport {
                        filename: filename.to_string(),
                        status: status.clone(),
                    },
                    status,
                );
            }
        };
        info!(
            "Co-citation network: {} nodes, {} edges",
            network.node_count(),
            network.edge_count()
        );

        let artifact = self.emit(plot_cocitation_network(&network, &self.style), filename);
        let status = artifact.status.clone();
        (artifact, status)
    }

    /// Fits the topic model and tags documents with [`RELEVANCE_PROPERTY`].
    ///
    /// On failure the input collection is returned unchanged.
    pub fn classify_topics(
        &self,
        documents: &DocumentCollection,
    ) -> (DocumentCollection, Vec<ArtifactReport>, StageStatus) {
        let mut artifacts = Vec::new();
        match self.classify(documents, &mut artifacts) {
            Ok(tagged) => (tagged, artifacts, StageStatus::Completed),
            Err(e) => {
                error!("Topic classification failed: {}", e);
                (documents.clone(), artifacts, StageStatus::Failed(e.to_string()))
            }
        }
    }

    fn classify(
        &self,
        documents: &DocumentCollection,
        artifacts: &mut Vec<ArtifactReport>,
    ) -> Result<DocumentCollection, ClassifyError> {
        let settings = &self.config.settings;

        let corpus = Corpus::build(documents, &settings.corpus)?;
        info!(
            "Corpus of {} documents with {} tokens",
            corpus.num_documents(),
            corpus.num_tokens()
        );
        artifacts.push(self.emit(
            plot_word_distribution(&corpus.word_distribution(settings.word_limit), &self.style),
            "word_distribution.png",
        ));

        let model = train_nmf_model(&corpus, &settings.nmf)?;
        for topic in 0..model.num_topics() {
            let tokens = model
                .best_tokens_for_topic(topic, 5)
                .into_iter()
                .map(|(token, _)| token)
                .join(", ");
            debug!("Topic {}: {}", topic + 1, tokens);
        }
        artifacts.push(self.emit(
            plot_topic_clouds(&model, &self.style, settings.cloud_columns, settings.cloud_words),
            "topic_clouds.png",
        ));
        artifacts.push(self.emit(
            plot_topic_embedding(&model, &self.style),
            "topic_embedding.png",
        ));

        let keyword = &self.config.topic_keyword;
        let topic = model.topic_for_keyword(keyword);
        info!("Topic {} selected for keyword '{}'", topic + 1, keyword);

        let relevance = model.relevance(topic, self.config.relevance_threshold);
        let tagged = documents.with_property(RELEVANCE_PROPERTY, relevance)?;
        let relevant = tagged
            .iter()
            .filter(|d| d.flag(RELEVANCE_PROPERTY) == Some(true))
            .count();
        info!("{} of {} documents are relevant", relevant, tagged.len());

        let negated = format!("not {}", RELEVANCE_PROPERTY);
        let groups = Groups::parse([("Relevant", RELEVANCE_PROPERTY), ("Other", negated.as_str())]);

        let grouped = HistogramOptions::default().with_groups(groups.clone());
        let years = compute_year_histogram(&tagged, &grouped);
        artifacts.push(self.emit(
            plot_histogram(&years, &self.style),
            "year_histogram_by_relevance.png",
        ));
        let sources = compute_source_histogram(
            &tagged,
            &HistogramOptions::limit(settings.grouped_source_limit).with_groups(groups),
        );
        artifacts.push(self.emit(
            plot_histogram(&sources, &self.style),
            "source_histogram_by_relevance.png",
        ));

        self.log_relevance_tables(&tagged);
        for (rank, (index, weight)) in model
            .best_documents_for_topic(topic, settings.best_documents)
            .into_iter()
            .enumerate()
        {
            if let Some(document) = tagged.get(index) {
                info!("{:>2}. ({:.2}) {}", rank + 1, weight, document.title);
            }
        }

        Ok(tagged)
    }

    fn log_relevance_tables(&self, tagged: &DocumentCollection) {
        info!("Relevant documents per year:");
        for row in relevance_by_year(tagged, RELEVANCE_PROPERTY) {
            info!(
                "  {}: {:>5.1}% ({}/{})",
                row.label,
                row.ratio() * 100.0,
                row.relevant,
                row.total
            );
        }

        let min_total = self.config.settings.min_source_documents;
        info!("Relevance ratio per source (at least {} documents):", min_total);
        for row in relevance_by_source(tagged, RELEVANCE_PROPERTY, min_total) {
            info!(
                "  {:.2} ({}/{}) {}",
                row.ratio(),
                row.relevant,
                row.total,
                row.label
            );
        }
    }

    /// Hands a rendered figure to the output policy.
    fn emit(&self, figure: Result<Figure, PlotError>, filename: &str) -> ArtifactReport {
        let status = match figure {
            Ok(figure) => match self.policy.emit(figure, filename) {
                ArtifactStatus::Saved(_) | ArtifactStatus::Displayed => StageStatus::Completed,
                ArtifactStatus::SaveFailed(reason) => StageStatus::Failed(reason),
            },
            Err(e) => {
                error!("Failed to plot {}: {}", filename, e);
                StageStatus::Failed(e.to_string())
            }
        };
        ArtifactReport {
            filename: filename.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use crate::config::PipelineSettings;
    use crate::refine::{RefineError, Refinement};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    struct FixedService(Result<Vec<Option<Document>>, ()>);

    impl MetadataService for FixedService {
        fn name(&self) -> &str {
            "fixed"
        }

        fn refine(&self, _documents: &DocumentCollection) -> Result<Refinement, RefineError> {
            match &self.0 {
                Ok(found) => Ok(Refinement {
                    found: found.clone(),
                    not_found: Vec::new(),
                }),
                Err(()) => Err(RefineError::MissingCredentials("fixed".to_string())),
            }
        }
    }

    fn config(data_dir: &Path, output_dir: &Path) -> Config {
        Config {
            data_dir: data_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            save_plots: true,
            topic_keyword: "travel".to_string(),
            scopus_api_key: None,
            relevance_threshold: 0.2,
            font: None,
            settings: PipelineSettings::default(),
        }
    }

    fn pipeline(data_dir: &Path, output_dir: &Path, service: FixedService) -> Pipeline {
        Pipeline::new(config(data_dir, output_dir), Box::new(service))
            .with_style(PlotStyle::default().with_dpi(10))
    }

    fn doc(title: &str) -> Document {
        Document {
            title: title.to_string(),
            ..Default::default()
        }
    }

    const IEEE: &str = "Document Title,Publication Year,DOI\n\
        Travel Demand Models,2020,10.1/a\n\
        Traffic Signal Control,2021,10.1/b\n";

    const SPRINGER: &str = "Item Title,Publication Year,Item DOI\n\
        Traffic signal control.,2021,10.1/b\n\
        Ride Sharing,2019,10.1/c\n";

    #[test]
    fn test_load_merges_overlapping_sources() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("ieee.csv"), IEEE).unwrap();
        std::fs::write(data.path().join("springer.csv"), SPRINGER).unwrap();

        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));
        let (documents, reports) = pipeline.load_sources();
        assert_eq!(documents.len(), 3);
        assert_eq!(reports[0].count, 2);
        assert_eq!(reports[1].count, 2);
        assert_eq!(reports[2].status, StageStatus::Skipped("file not found".to_string()));
    }

    #[test]
    fn test_unreadable_source_is_reported() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("ieee.csv"), IEEE).unwrap();
        std::fs::write(data.path().join("zotero.bib"), [0xff, 0xfe, 0x40, 0x80]).unwrap();

        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));
        let (documents, reports) = pipeline.load_sources();
        assert_eq!(documents.len(), 2);
        assert!(matches!(reports[2].status, StageStatus::Failed(_)));
    }

    #[test]
    fn test_source_without_usable_records_is_skipped() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("ieee.csv"), IEEE).unwrap();
        let untitled = "@article{untitled, year = {2020}}\n";
        std::fs::write(data.path().join("zotero.bib"), untitled).unwrap();

        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));
        let (documents, reports) = pipeline.load_sources();
        assert_eq!(documents.len(), 2);
        assert!(matches!(reports[2].status, StageStatus::Skipped(_)));
    }

    #[test]
    fn test_no_sources_is_fatal() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let header_only = "Document Title,Publication Year\n";
        std::fs::write(data.path().join("ieee.csv"), header_only).unwrap();

        let result = pipeline(data.path(), out.path(), FixedService(Err(()))).run();
        assert!(matches!(result, Err(PipelineError::NoSources(_))));
        // No later stage ran
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_exclusions() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));
        let documents = DocumentCollection::from(vec![doc("Travel Demand"), doc("Ride Sharing")]);

        let (unchanged, status) = pipeline.apply_exclusions(&documents);
        assert!(unchanged.ptr_eq(&documents));
        assert!(matches!(status, StageStatus::Skipped(_)));

        std::fs::write(data.path().join(EXCLUSION_FILE), "").unwrap();
        let (unchanged, status) = pipeline.apply_exclusions(&documents);
        assert_eq!(unchanged.len(), 2);
        assert_eq!(status, StageStatus::Completed);

        std::fs::write(
            data.path().join(EXCLUSION_FILE),
            "TY  - JOUR\nTI  - Ride sharing\nER  -\n",
        )
        .unwrap();
        let (remaining, status) = pipeline.apply_exclusions(&documents);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get(0).map(|d| d.title.as_str()), Some("Travel Demand"));
        assert_eq!(status, StageStatus::Completed);
    }

    #[test]
    fn test_refinement_success_drops_empty_slots() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let service = FixedService(Ok(vec![Some(doc("Refined")), None]));
        let pipeline = pipeline(data.path(), out.path(), service);

        let documents = DocumentCollection::from(vec![doc("A"), doc("B")]);
        let (refined, status) = pipeline.refine_metadata(&documents);
        assert_eq!(status, StageStatus::Completed);
        assert_eq!(refined.len(), 1);
    }

    #[test]
    fn test_refinement_failure_is_passthrough() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));

        let documents = DocumentCollection::from(vec![doc("A"), doc("B")]);
        let (refined, status) = pipeline.refine_metadata(&documents);
        assert!(refined.ptr_eq(&documents));
        assert!(matches!(status, StageStatus::Degraded(_)));
    }

    #[test]
    fn test_statistics_plots_are_independent() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));

        // Years but no authors, affiliations, languages or sources
        let documents = DocumentCollection::from(vec![Document {
            year: Some(2020),
            ..doc("A")
        }]);
        let (artifacts, status) = pipeline.report_statistics(&documents);

        assert_eq!(artifacts.len(), 6);
        assert_eq!(artifacts[0].status, StageStatus::Completed);
        assert!(out.path().join("year_histogram.png").is_file());
        assert!(matches!(artifacts[1].status, StageStatus::Failed(_)));
        assert_eq!(status, StageStatus::Degraded("5 of 6 plots failed".to_string()));
    }

    #[test]
    fn test_topic_failure_returns_input() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let pipeline = pipeline(data.path(), out.path(), FixedService(Err(())));

        let documents = DocumentCollection::from(vec![doc("The"), doc("Of")]);
        let (result, artifacts, status) = pipeline.classify_topics(&documents);
        assert!(result.ptr_eq(&documents));
        assert!(artifacts.is_empty());
        assert!(matches!(status, StageStatus::Failed(_)));
    }

    #[test]
    fn test_classify_topics_tags_every_document() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut config = config(data.path(), out.path());
        config.settings.corpus.min_docs = 2;
        config.settings.nmf.num_topics = 2;
        let pipeline = Pipeline::new(config, Box::new(FixedService(Err(()))))
            .with_style(PlotStyle::default().with_dpi(10));

        let titles = [
            "travel demand travel model",
            "travel survey travel data",
            "travel mode travel choice",
            "traffic signal traffic control",
            "traffic flow traffic data",
            "traffic jam traffic model",
        ];
        let documents: DocumentCollection = titles.iter().map(|t| doc(t)).collect();
        let (tagged, artifacts, status) = pipeline.classify_topics(&documents);

        assert_eq!(status, StageStatus::Completed);
        assert_eq!(tagged.len(), 6);
        assert!(tagged.iter().all(|d| d.flag(RELEVANCE_PROPERTY).is_some()));
        let filenames: Vec<&str> = artifacts.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(
            filenames,
            vec![
                "word_distribution.png",
                "topic_clouds.png",
                "topic_embedding.png",
                "year_histogram_by_relevance.png",
                "source_histogram_by_relevance.png",
            ]
        );
    }
}
