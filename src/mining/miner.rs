//! Level-wise frequent subgraph mining over a corpus of usage graphs.
//!
//! Level one holds a template per distinct node label, plus one per subset of
//! self loops seen on that label. Every level grows the frequent templates of
//! the previous level by one host node adjacent to one of their occurrences.
//! The grown template keeps exactly the edges of its parent and takes a
//! non-empty subset of the host edges joining the new node to the occurrence,
//! so edge subsets shared across hosts are found even when the hosts differ in
//! their extra edges. Grown templates are deduplicated by canonical label and
//! the corpus is re-scanned for their support. Support never grows with the
//! template, so infrequent templates are never extended.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::config::{MiningConfig, NormalizationConfig, SupportPolicy};
use crate::core::errors::{Result, SchaapiError};
use crate::graph::normalizer::{encode_canonical_label, GraphNormalizer};
use crate::graph::usage::UsageEdge;
use crate::mining::corpus::Corpus;
use crate::mining::matcher::{find_embeddings, LabeledGraph};
use crate::mining::pattern::{Exemplar, Pattern, PatternNode};

/// Result of one mining run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningOutcome {
    /// Every frequent template, ordered by support, edge count and label
    pub patterns: Vec<Pattern>,
    /// Number of template sizes explored
    pub levels: usize,
    /// Number of distinct templates whose support was computed
    pub candidates_evaluated: usize,
    /// Growth stopped early because the time budget ran out
    pub truncated: bool,
    /// Grown templates dropped because no canonical label could be computed
    #[serde(default)]
    pub unlabeled_templates: usize,
}

/// Most host edges between a new node and an occurrence whose subsets are
/// all tried; wider joins only try each single edge and the full set.
const MAX_ENUMERATED_LINKS: usize = 10;

/// Frequent pattern miner configured for one run.
#[derive(Debug, Clone)]
pub struct PatternMiner {
    config: MiningConfig,
    normalizer: GraphNormalizer,
    parallel: bool,
}

impl PatternMiner {
    /// Create a miner
    pub fn new(config: MiningConfig, normalization: NormalizationConfig) -> Self {
        Self {
            config,
            normalizer: GraphNormalizer::new(normalization),
            parallel: true,
        }
    }

    /// Scan graphs on the rayon pool (default) or on the calling thread
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Mining thresholds in use
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mine all templates whose support reaches `min_support`.
    ///
    /// Rejects support thresholds below two and corpora declaring fewer than
    /// two projects. A corpus without library usage yields no pattern.
    pub fn mine(&self, corpus: &Corpus) -> Result<MiningOutcome> {
        self.config.validate()?;
        if corpus.project_count() < 2 {
            return Err(SchaapiError::config_field(
                format!(
                    "mining needs at least 2 distinct projects, corpus has {}",
                    corpus.project_count()
                ),
                "corpus.projects",
            ));
        }
        if corpus.is_empty() {
            info!(
                projects = corpus.project_count(),
                "Corpus has no library usage, nothing to mine"
            );
            return Ok(MiningOutcome::default());
        }

        let index = CorpusIndex::new(corpus);
        let deadline = self
            .config
            .timeout_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        info!(
            graphs = corpus.len(),
            projects = corpus.project_count(),
            labels = index.labels.len(),
            min_support = self.config.min_support,
            max_pattern_size = self.config.max_pattern_size,
            "Starting pattern mining"
        );

        let mut outcome = MiningOutcome::default();
        let mut capped = 0usize;
        let mut all_frequent: Vec<Frequent> = Vec::new();

        let seeds = self.seeds(&index, &mut outcome);
        let mut level = self.evaluate_level(&index, seeds, &mut outcome, &mut capped);
        outcome.levels = 1;
        debug!(level = 1, frequent = level.len(), "Mined level");

        while !level.is_empty() && outcome.levels < self.config.max_pattern_size {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    levels = outcome.levels,
                    "Mining time budget exhausted, stopping template growth"
                );
                outcome.truncated = true;
                break;
            }

            let candidates = self.extend(&index, &level, &mut outcome);
            let candidate_count = candidates.len();
            let next = self.evaluate_level(&index, candidates, &mut outcome, &mut capped);
            all_frequent.append(&mut level);
            level = next;
            if level.is_empty() {
                break;
            }

            outcome.levels += 1;
            debug!(
                level = outcome.levels,
                candidates = candidate_count,
                frequent = level.len(),
                "Mined level"
            );
        }
        all_frequent.append(&mut level);

        if capped > 0 {
            warn!(
                graphs = capped,
                limit = self.config.max_embeddings_per_graph,
                "Occurrence limit reached; some extensions may be missed"
            );
        }

        if outcome.unlabeled_templates > 0 {
            warn!(
                templates = outcome.unlabeled_templates,
                "Skipped templates that could not be canonically labeled"
            );
        }

        outcome.patterns = all_frequent
            .into_iter()
            .map(|frequent| frequent.into_pattern(&index, corpus))
            .collect::<Result<_>>()?;
        sort_patterns(&mut outcome.patterns);

        info!(
            patterns = outcome.patterns.len(),
            levels = outcome.levels,
            candidates = outcome.candidates_evaluated,
            truncated = outcome.truncated,
            "Pattern mining complete"
        );
        Ok(outcome)
    }

    /// Compute support for each candidate and keep the frequent ones
    fn evaluate_level(
        &self,
        index: &CorpusIndex,
        candidates: Vec<Candidate>,
        outcome: &mut MiningOutcome,
        capped: &mut usize,
    ) -> Vec<Frequent> {
        let mut frequent = Vec::new();
        for candidate in candidates {
            outcome.candidates_evaluated += 1;
            let scanned = self.scan(index, &candidate.template);

            let mut embeddings = Vec::new();
            let mut projects = BTreeSet::new();
            let mut occurrences = 0;
            for (graph, found) in scanned {
                if found.is_empty() {
                    continue;
                }
                if found.len() >= self.config.max_embeddings_per_graph {
                    *capped += 1;
                }
                occurrences += found.len();
                projects.insert(index.projects[graph]);
                embeddings.push((graph, found));
            }

            let support = match self.config.support_policy {
                SupportPolicy::Projects => projects.len(),
                SupportPolicy::Graphs => embeddings.len(),
            };
            if support >= self.config.min_support {
                frequent.push(Frequent {
                    template: candidate.template,
                    label: candidate.label,
                    support,
                    occurrences,
                    projects,
                    embeddings,
                });
            }
        }

        frequent.sort_by(|a, b| {
            b.support
                .cmp(&a.support)
                .then_with(|| b.template.edges().len().cmp(&a.template.edges().len()))
                .then_with(|| a.label.cmp(&b.label))
        });
        frequent
    }

    /// Occurrences of a template in every graph that holds all of its labels
    fn scan(&self, index: &CorpusIndex, template: &LabeledGraph) -> Vec<(usize, Vec<Vec<usize>>)> {
        let graphs = index.graphs_with_labels(template.labels());
        let limit = self.config.max_embeddings_per_graph;
        let find = |&graph: &usize| (graph, find_embeddings(template, &index.hosts[graph], limit));

        if self.parallel {
            graphs.par_iter().map(find).collect()
        } else {
            graphs.iter().map(find).collect()
        }
    }

    /// One template per label, and one per label and subset of the self loops
    /// found on a node with that label
    fn seeds(&self, index: &CorpusIndex, outcome: &mut MiningOutcome) -> Vec<Candidate> {
        let mut candidates: BTreeMap<String, Candidate> = (0..index.labels.len())
            .map(|label| Candidate::seed(index, label as u32))
            .map(|candidate| (candidate.label.clone(), candidate))
            .collect();
        let mut seen: HashSet<(usize, Vec<usize>, Vec<UsageEdge>)> = HashSet::new();

        for (graph, host) in index.hosts.iter().enumerate() {
            for node in 0..host.len() {
                let loops = host.edges_between(node, &[]);
                for edges in link_subsets(&loops, &loops) {
                    self.offer(
                        index,
                        graph,
                        vec![node],
                        edges,
                        &mut seen,
                        &mut candidates,
                        outcome,
                    );
                }
            }
        }
        candidates.into_values().collect()
    }

    /// Grow every frequent template by one adjacent host node
    fn extend(
        &self,
        index: &CorpusIndex,
        level: &[Frequent],
        outcome: &mut MiningOutcome,
    ) -> Vec<Candidate> {
        let mut seen: HashSet<(usize, Vec<usize>, Vec<UsageEdge>)> = HashSet::new();
        let mut candidates: BTreeMap<String, Candidate> = BTreeMap::new();
        let mut wide = 0usize;

        for frequent in level {
            for (graph, embeddings) in &frequent.embeddings {
                let host = &index.hosts[*graph];
                for embedding in embeddings {
                    let parent: Vec<UsageEdge> = frequent
                        .template
                        .edges()
                        .iter()
                        .map(|e| UsageEdge::new(embedding[e.from], embedding[e.to], e.kind))
                        .collect();
                    let adjacent: BTreeSet<usize> = embedding
                        .iter()
                        .flat_map(|&node| host.neighbors(node).iter().copied())
                        .filter(|node| !embedding.contains(node))
                        .collect();

                    for extra in adjacent {
                        let links = host.edges_between(extra, embedding);
                        let joining: Vec<UsageEdge> =
                            links.iter().filter(|e| e.from != e.to).copied().collect();
                        if links.len() > MAX_ENUMERATED_LINKS {
                            wide += 1;
                        }

                        let mut nodes = embedding.clone();
                        nodes.push(extra);
                        for chosen in link_subsets(&links, &joining) {
                            let mut edges = parent.clone();
                            edges.extend(chosen);
                            self.offer(
                                index,
                                *graph,
                                nodes.clone(),
                                edges,
                                &mut seen,
                                &mut candidates,
                                outcome,
                            );
                        }
                    }
                }
            }
        }

        if wide > 0 {
            debug!(
                joins = wide,
                limit = MAX_ENUMERATED_LINKS,
                "Only single edges and full joins tried for wide joins"
            );
        }
        candidates.into_values().collect()
    }

    /// Label one host subgraph and add it to `candidates` unless an equal
    /// subgraph was offered before
    #[allow(clippy::too_many_arguments)]
    fn offer(
        &self,
        index: &CorpusIndex,
        graph: usize,
        nodes: Vec<usize>,
        mut edges: Vec<UsageEdge>,
        seen: &mut HashSet<(usize, Vec<usize>, Vec<UsageEdge>)>,
        candidates: &mut BTreeMap<String, Candidate>,
        outcome: &mut MiningOutcome,
    ) {
        edges.sort_unstable();
        let mut key_nodes = nodes.clone();
        key_nodes.sort_unstable();
        if !seen.insert((graph, key_nodes, edges.clone())) {
            return;
        }

        match self.candidate(index, graph, &nodes, &edges) {
            Ok(candidate) => {
                candidates.entry(candidate.label.clone()).or_insert(candidate);
            }
            Err(err) => {
                outcome.unlabeled_templates += 1;
                debug!(graph, error = %err, "Skipping template that cannot be labeled");
            }
        }
    }

    /// Canonical template made of host `nodes` and host `edges` in one graph
    fn candidate(
        &self,
        index: &CorpusIndex,
        graph: usize,
        nodes: &[usize],
        edges: &[UsageEdge],
    ) -> Result<Candidate> {
        let (labels, edges) = index.hosts[graph].restrict(nodes, edges);
        let tiebreak: Vec<usize> = nodes.iter().map(|&n| index.orders[graph][n]).collect();
        let form = self.normalizer.canonical_form(&labels, &edges, &tiebreak)?;

        let labels: Vec<u32> = form.order.iter().map(|&i| labels[i]).collect();
        let label = index.encode(&labels, &form.edges);
        Ok(Candidate {
            template: LabeledGraph::new(labels, form.edges),
            label,
        })
    }
}

/// Non-empty subsets of `links` that contain at least one edge of `required`.
///
/// With more than [`MAX_ENUMERATED_LINKS`] links only each required edge on
/// its own and the full set are returned.
fn link_subsets(links: &[UsageEdge], required: &[UsageEdge]) -> Vec<Vec<UsageEdge>> {
    if links.is_empty() || required.is_empty() {
        return Vec::new();
    }
    if links.len() > MAX_ENUMERATED_LINKS {
        let mut subsets: Vec<Vec<UsageEdge>> = required.iter().map(|&e| vec![e]).collect();
        subsets.push(links.to_vec());
        return subsets;
    }

    (1u32..(1 << links.len()))
        .map(|bits| {
            links
                .iter()
                .enumerate()
                .filter(|&(i, _)| bits & (1 << i) != 0)
                .map(|(_, &e)| e)
                .collect::<Vec<_>>()
        })
        .filter(|subset| subset.iter().any(|e| required.contains(e)))
        .collect()
}

/// Order patterns by descending support, then descending edge count, then
/// canonical label
pub fn sort_patterns(patterns: &mut [Pattern]) {
    patterns.sort_by(|a, b| {
        b.support
            .cmp(&a.support)
            .then_with(|| b.edge_count().cmp(&a.edge_count()))
            .then_with(|| a.label.cmp(&b.label))
    });
}

/// Template awaiting a support scan.
struct Candidate {
    template: LabeledGraph,
    label: String,
}

impl Candidate {
    fn seed(index: &CorpusIndex, label: u32) -> Self {
        Self {
            template: LabeledGraph::new(vec![label], Vec::new()),
            label: index.encode(&[label], &[]),
        }
    }
}

/// Template that reached the support threshold, with its occurrences.
struct Frequent {
    template: LabeledGraph,
    label: String,
    support: usize,
    occurrences: usize,
    projects: BTreeSet<usize>,
    embeddings: Vec<(usize, Vec<Vec<usize>>)>,
}

impl Frequent {
    fn into_pattern(self, index: &CorpusIndex, corpus: &Corpus) -> Result<Pattern> {
        let (graph, embedding) = self
            .embeddings
            .first()
            .and_then(|(graph, found)| found.first().map(|e| (*graph, e.clone())))
            .ok_or_else(|| {
                SchaapiError::internal(format!("frequent template {} has no occurrence", self.label))
            })?;
        let entry = &corpus.entries()[graph];
        let host_nodes = entry.graph.nodes();

        let nodes = embedding
            .iter()
            .map(|&n| PatternNode::new(host_nodes[n].kind(), host_nodes[n].symbol()))
            .collect();
        let node_orders: Vec<usize> = embedding.iter().map(|&n| host_nodes[n].order).collect();
        let mut matched: Vec<&_> = embedding.iter().map(|&n| &host_nodes[n]).collect();
        matched.sort_by_key(|node| node.order);

        Ok(Pattern {
            nodes,
            edges: self.template.edges().to_vec(),
            label: self.label,
            support: self.support,
            occurrences: self.occurrences,
            projects: self
                .projects
                .into_iter()
                .map(|p| index.project_names[p].clone())
                .collect(),
            exemplar: Exemplar {
                project: entry.method.project.clone(),
                method: entry.method.signature.clone(),
                instructions: matched.into_iter().map(|n| n.instruction.clone()).collect(),
                node_orders,
            },
        })
    }
}

/// Interned view of a corpus used during one run.
struct CorpusIndex {
    /// Distinct node labels, sorted; a label's id is its position
    labels: Vec<String>,
    hosts: Vec<LabeledGraph>,
    /// Program order of every node, per graph
    orders: Vec<Vec<usize>>,
    /// Project id of every graph
    projects: Vec<usize>,
    project_names: Vec<String>,
    /// Graphs containing each label, ascending
    label_graphs: Vec<Vec<usize>>,
}

impl CorpusIndex {
    fn new(corpus: &Corpus) -> Self {
        let labels: Vec<String> = corpus
            .entries()
            .iter()
            .flat_map(|entry| entry.graph.labels())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let ids: HashMap<&str, u32> = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.as_str(), id as u32))
            .collect();

        let project_names: Vec<String> = corpus.projects().iter().cloned().collect();
        let project_ids: HashMap<&str, usize> = project_names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.as_str(), id))
            .collect();

        let mut hosts = Vec::with_capacity(corpus.len());
        let mut orders = Vec::with_capacity(corpus.len());
        let mut projects = Vec::with_capacity(corpus.len());
        let mut label_graphs = vec![Vec::new(); labels.len()];

        for (graph, entry) in corpus.entries().iter().enumerate() {
            let node_labels: Vec<u32> = entry
                .graph
                .nodes()
                .iter()
                .map(|node| ids[node.label().as_str()])
                .collect();
            for &label in node_labels.iter().collect::<BTreeSet<_>>() {
                label_graphs[label as usize].push(graph);
            }
            hosts.push(LabeledGraph::new(node_labels, entry.graph.edges().to_vec()));
            orders.push(entry.graph.nodes().iter().map(|n| n.order).collect());
            projects.push(project_ids[entry.project()]);
        }

        Self {
            labels,
            hosts,
            orders,
            projects,
            project_names,
            label_graphs,
        }
    }

    /// Graphs containing every label in `labels`
    fn graphs_with_labels(&self, labels: &[u32]) -> Vec<usize> {
        let distinct: BTreeSet<u32> = labels.iter().copied().collect();
        let mut lists: Vec<&Vec<usize>> = distinct
            .iter()
            .map(|&label| &self.label_graphs[label as usize])
            .collect();
        lists.sort_by_key(|list| list.len());

        let Some((first, rest)) = lists.split_first() else {
            return Vec::new();
        };
        first
            .iter()
            .copied()
            .filter(|graph| rest.iter().all(|list| list.binary_search(graph).is_ok()))
            .collect()
    }

    fn encode(&self, labels: &[u32], edges: &[UsageEdge]) -> String {
        encode_canonical_label(
            labels.iter().map(|&label| self.labels[label as usize].as_str()),
            edges,
        )
    }
}
