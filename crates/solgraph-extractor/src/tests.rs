//! Integration tests for the Extractor

#[cfg(test)]
mod tests {
    use crate::{
        ChunkSplitter, ChunkStatus, DocumentDialect, DocumentStructureScanner, Extractor,
        ExtractorConfig, StructureMode, UNSECTIONED,
    };
    use proptest::prelude::*;
    use solgraph_domain::traits::LlmProvider;
    use solgraph_domain::{
        reconstruct_source, ChunkId, EntityType, OntologySchema, RelationshipType, SplitKind,
    };
    use solgraph_gatekeeper::Gatekeeper;
    use solgraph_llm::{LlmError, MockProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn scenario_a_document() -> String {
        let requirements: Vec<String> = (1..=8)
            .map(|i| format!("The contractor shall provide item {}.", i))
            .collect();
        format!(
            "SECTION A - SOLICITATION/CONTRACT FORM\n\
             This cover page identifies the acquisition.\n\
             SECTION C - PERFORMANCE WORK STATEMENT\n\
             {}\n\
             SECTION I - CONTRACT CLAUSES\n\
             FAR 52.212-4 Contract Terms and Conditions is incorporated by reference.\n",
            requirements.join(" ")
        )
    }

    fn rfp_document() -> String {
        "SECTION A - SOLICITATION/CONTRACT FORM\n\
         Offers are due at the address in block 9.\n\
         SECTION C - STATEMENT OF WORK\n\
         C.1 Reporting\n\
         The contractor shall deliver a quarterly security briefing to the program office.\n\
         SECTION L - INSTRUCTIONS TO OFFERORS\n\
         Offerors must submit the technical volume zephyr in PDF.\n"
            .to_string()
    }

    fn extractor_with(llm: MockProvider, config: ExtractorConfig) -> Extractor<MockProvider> {
        Extractor::new(
            llm,
            Gatekeeper::default_config(),
            Arc::new(OntologySchema::government_contracting()),
            config,
        )
        .unwrap()
    }

    const BRIEFING_RESPONSE: &str = r#"{
        "entities": [
            {"name": "Quarterly Security Briefing", "type": "DELIVERABLE", "description": "Quarterly briefing"},
            {"name": "Contractor", "type": "ORGANIZATION"},
            {"name": "ATTCH-0300000-02", "type": "DOCUMENT", "description": "Briefing template"},
            {"name": "rounding", "type": "CONCEPT"},
            {"name": "Widget", "type": "GADGET"}
        ],
        "relationships": [
            {"source": "Contractor", "target": "Quarterly Security Briefing", "relation": "DELIVERS", "strength": 0.8},
            {"source": "Quarterly Security Briefing", "target": "ATTCH-0300000-02", "relation": "REFERENCES"},
            {"source": "Contractor", "target": "ATTCH-0300000-02", "relation": "EVALUATES"},
            {"source": "Contractor", "target": "rounding", "relation": "DELIVERS"}
        ]
    }"#;

    #[test]
    fn test_scenario_a_density_split() {
        let text = scenario_a_document();
        let extractor = extractor_with(MockProvider::default(), ExtractorConfig::default());
        let prepared = extractor.prepare("rfp", &text).unwrap();

        let c_counts: Vec<_> = prepared
            .chunks()
            .iter()
            .filter(|c| c.section_id.as_deref() == Some("C"))
            .map(|c| c.requirement_count)
            .collect();
        assert_eq!(c_counts, vec![3, 3, 2]);

        let per_section = extractor.metadata_snapshot().chunks_per_section();
        assert_eq!(per_section.get("A"), Some(&1));
        assert_eq!(per_section.get("C"), Some(&3));
        assert_eq!(per_section.get("I"), Some(&1));
        assert_eq!(per_section.len(), 3);

        assert_eq!(reconstruct_source(prepared.chunks()), text);
    }

    #[tokio::test]
    async fn test_scenario_a_run_summary() {
        let extractor = extractor_with(MockProvider::default(), ExtractorConfig::default());
        let result = extractor
            .process_document("rfp", &scenario_a_document())
            .await
            .unwrap();

        let summary = &result.summary;
        assert_eq!(summary.chunk_count, 5);
        assert_eq!(summary.chunks_per_section.get("C"), Some(&3));
        assert_eq!(summary.requirements_per_section.get("C"), Some(&8));
        assert!(matches!(
            summary.structure_mode,
            StructureMode::Structured { sections: 3, .. }
        ));
        assert_eq!(summary.ok_count(), 5);
        assert_eq!(summary.schema_version, "govcon-1");
    }

    #[tokio::test]
    async fn test_full_extraction_flow() {
        let mut llm = MockProvider::default();
        llm.add_response("quarterly security briefing", BRIEFING_RESPONSE);
        llm.add_response("volume zephyr", "I am unable to find entities in this text.");
        let extractor = extractor_with(llm.clone(), ExtractorConfig::default());

        let result = extractor
            .process_document("rfp", &rfp_document())
            .await
            .unwrap();

        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Quarterly Security Briefing", "Contractor", "ATTCH-0300000-02"]
        );
        assert!(result.entities[2].protected);
        assert_eq!(
            result.entities[0].key(),
            "DELIVERABLE:quarterly security briefing"
        );

        assert_eq!(result.relationships.len(), 2);
        assert_eq!(result.relationships[0].relation, RelationshipType::Delivers);
        assert_eq!(result.relationships[0].strength, Some(0.8));

        let stats = &result.summary.validation;
        assert_eq!(stats.entities_accepted, 3);
        assert_eq!(stats.entities_rejected, 2);
        assert_eq!(stats.relationships_accepted, 2);
        assert_eq!(stats.relationships_rejected, 2);
        assert_eq!(stats.rejected_for("trivial"), 1);
        assert_eq!(stats.rejected_for("unknown_entity_type"), 1);
        assert_eq!(stats.rejected_for("triple_not_whitelisted"), 1);
        assert_eq!(stats.rejected_for("rejected_endpoint"), 1);

        let summary = &result.summary;
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.ok_count(), 2);
        assert_eq!(summary.malformed_count(), 1);
        assert!(matches!(
            summary.chunk_reports[2].status,
            ChunkStatus::Malformed { .. }
        ));
        assert_eq!(summary.chunk_reports[1].entities_accepted, 3);
        assert_eq!(summary.chunk_reports[1].rejections, 4);
        assert_eq!(llm.call_count(), 3);

        let text = summary.summary();
        assert!(text.contains("2 ok, 1 malformed"));
        assert!(text.contains("triple_not_whitelisted: 1"));
    }

    #[tokio::test]
    async fn test_prompts_carry_chunk_context() {
        let llm = MockProvider::default();
        let extractor = extractor_with(llm.clone(), ExtractorConfig::default());
        extractor
            .process_document("rfp", &rfp_document())
            .await
            .unwrap();

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 3);
        let c_prompt = prompts
            .iter()
            .find(|p| p.contains("quarterly security briefing"))
            .unwrap();
        assert!(c_prompt.contains("Document section: C (STATEMENT OF WORK)"));
        assert!(c_prompt.contains("Subsection: C.1"));
        assert!(c_prompt.contains("Entity types (use exactly one of these, nothing else)"));
    }

    #[tokio::test]
    async fn test_scenario_b_identifier_and_triviality() {
        let mut llm = MockProvider::default();
        llm.add_response(
            "scenario bravo",
            r#"{"entities": [
                {"name": "ATTCH-0200000-17", "type": "DELIVERABLE"},
                {"name": "rounding", "type": "DELIVERABLE"}
            ], "relationships": []}"#,
        );
        let extractor = extractor_with(llm, ExtractorConfig::default());
        let text = "SECTION B - SUPPLIES\nPrices.\nSECTION C - WORK\nscenario bravo text.\nSECTION F - DELIVERIES\nDates.\n";

        let result = extractor.process_document("rfp", text).await.unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "ATTCH-0200000-17");
        assert_eq!(result.entities[0].entity_type, EntityType::Deliverable);
        assert_eq!(result.summary.validation.rejected_for("trivial"), 1);
    }

    #[tokio::test]
    async fn test_scenario_c_triple_whitelist() {
        let schema = OntologySchema::builder("section-contains-document")
            .entity_types(EntityType::ALL)
            .relationship_types(RelationshipType::ALL)
            .triple(EntityType::Section, RelationshipType::Contains, EntityType::Document)
            .build()
            .unwrap();
        let mut llm = MockProvider::default();
        llm.add_response(
            "scenario charlie",
            r#"{"entities": [
                {"name": "Section C", "type": "SECTION"},
                {"name": "Attachment J-1", "type": "DOCUMENT"}
            ], "relationships": [
                {"source": "Section C", "relation": "EVALUATES", "target": "Attachment J-1"},
                {"source": "Section C", "relation": "CONTAINS", "target": "Attachment J-1"}
            ]}"#,
        );
        let extractor = Extractor::new(
            llm,
            Gatekeeper::default_config(),
            Arc::new(schema),
            ExtractorConfig::default(),
        )
        .unwrap();
        let text = "SECTION B - SUPPLIES\nPrices.\nSECTION C - WORK\nscenario charlie text.\nSECTION F - DELIVERIES\nDates.\n";

        let result = extractor.process_document("rfp", text).await.unwrap();
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.relationships[0].relation, RelationshipType::Contains);
        assert_eq!(
            result.summary.validation.rejected_for("triple_not_whitelisted"),
            1
        );
        assert_eq!(result.summary.schema_version, "section-contains-document");
    }

    #[tokio::test]
    async fn test_extraction_timeout_is_chunk_local() {
        let llm = MockProvider::default().with_delay(Duration::from_secs(2));
        let config = ExtractorConfig {
            extraction_timeout_secs: 1,
            ..ExtractorConfig::default()
        };
        let extractor = extractor_with(llm, config);

        let result = extractor
            .process_document("rfp", &rfp_document())
            .await
            .unwrap();
        assert_eq!(result.summary.timeout_count(), 3);
        assert_eq!(
            result.summary.chunk_reports[0].status,
            ChunkStatus::Timeout { after_secs: 1 }
        );
        assert!(result.entities.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let llm = MockProvider::default();
        let extractor = extractor_with(llm.clone(), ExtractorConfig::default());
        let prepared = extractor.prepare("rfp", &rfp_document()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = extractor.run(prepared, cancel).await.unwrap();

        assert_eq!(result.summary.cancelled_count(), 3);
        assert_eq!(result.summary.chunk_count, 3);
        assert_eq!(llm.call_count(), 0);
    }

    /// Engine that cancels the run on its first call
    struct CancellingProvider {
        cancel: CancellationToken,
        calls: AtomicUsize,
    }

    impl LlmProvider for CancellingProvider {
        type Error = LlmError;

        fn generate(&self, _prompt: &str) -> Result<String, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            Ok(r#"{"entities": [], "relationships": []}"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_unsubmitted_chunks() {
        let cancel = CancellationToken::new();
        let provider = CancellingProvider {
            cancel: cancel.clone(),
            calls: AtomicUsize::new(0),
        };
        let config = ExtractorConfig {
            max_concurrent_extractions: 1,
            ..ExtractorConfig::default()
        };
        let extractor = Extractor::new(
            provider,
            Gatekeeper::default_config(),
            Arc::new(OntologySchema::government_contracting()),
            config,
        )
        .unwrap();
        let prepared = extractor.prepare("rfp", &scenario_a_document()).unwrap();

        let result = extractor.run(prepared, cancel).await.unwrap();
        let summary = &result.summary;
        assert_eq!(summary.ok_count(), 1);
        assert_eq!(summary.cancelled_count(), 4);
        assert_eq!(summary.chunk_reports[0].status, ChunkStatus::Ok);
        let ordinals: Vec<_> = summary.chunk_reports.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    /// How many engine calls overlap
    #[derive(Default)]
    struct CallStats {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    /// Engine that sleeps for `latency` and records overlapping calls
    struct TrackingProvider {
        stats: Arc<CallStats>,
        latency: Duration,
    }

    impl TrackingProvider {
        fn new(stats: &Arc<CallStats>, latency: Duration) -> Self {
            Self {
                stats: Arc::clone(stats),
                latency,
            }
        }
    }

    impl LlmProvider for TrackingProvider {
        type Error = LlmError;

        fn generate(&self, _prompt: &str) -> Result<String, Self::Error> {
            let stats = &self.stats;
            stats.calls.fetch_add(1, Ordering::SeqCst);
            let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.latency);
            stats.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(r#"{"entities": []}"#.to_string())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let stats = Arc::new(CallStats::default());
        let config = ExtractorConfig {
            max_concurrent_extractions: 2,
            ..ExtractorConfig::default()
        };
        let extractor = Extractor::new(
            TrackingProvider::new(&stats, Duration::from_millis(50)),
            Gatekeeper::default_config(),
            Arc::new(OntologySchema::government_contracting()),
            config,
        )
        .unwrap();

        let result = extractor
            .process_document("rfp", &scenario_a_document())
            .await
            .unwrap();

        assert_eq!(result.summary.ok_count(), 5);
        assert_eq!(stats.calls.load(Ordering::SeqCst), 5);
        let peak = stats.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak concurrency was {}", peak);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_calls_still_count_against_limit() {
        let stats = Arc::new(CallStats::default());
        let config = ExtractorConfig {
            max_concurrent_extractions: 1,
            extraction_timeout_secs: 1,
            ..ExtractorConfig::default()
        };
        let extractor = Extractor::new(
            TrackingProvider::new(&stats, Duration::from_millis(1500)),
            Gatekeeper::default_config(),
            Arc::new(OntologySchema::government_contracting()),
            config,
        )
        .unwrap();

        let result = extractor
            .process_document("rfp", &rfp_document())
            .await
            .unwrap();

        assert_eq!(result.summary.timeout_count(), 3);
        assert!(result
            .summary
            .chunk_reports
            .iter()
            .all(|r| r.status == ChunkStatus::Timeout { after_secs: 1 }));
        let peak = stats.peak.load(Ordering::SeqCst);
        assert_eq!(peak, 1, "peak concurrency was {}", peak);
    }

    #[tokio::test]
    async fn test_run_reports_its_own_chunk_layout() {
        let extractor = extractor_with(MockProvider::default(), ExtractorConfig::default());
        let first = extractor.prepare("rfp", &rfp_document()).unwrap();
        extractor
            .prepare("memo", "A short memo without any structure.")
            .unwrap();

        let result = extractor.run(first, CancellationToken::new()).await.unwrap();
        let sections: Vec<_> = result
            .summary
            .chunks_per_section
            .iter()
            .map(|(section, count)| (section.as_str(), *count))
            .collect();
        assert_eq!(sections, vec![("A", 1), ("C", 1), ("L", 1)]);
        assert!(!result.summary.chunks_per_section.contains_key(UNSECTIONED));

        let meta = extractor.chunk_metadata(&ChunkId::new("rfp", 1)).unwrap();
        assert_eq!(meta.section_id.as_deref(), Some("C"));
        assert!(extractor.chunk_metadata(&ChunkId::new("memo", 0)).is_none());
    }

    #[tokio::test]
    async fn test_sliding_window_fallback_run() {
        let text = "The offeror shall provide pricing. ".repeat(40);
        let config = ExtractorConfig {
            max_chunk_chars: 500,
            sliding_window_overlap_chars: 50,
            ..ExtractorConfig::default()
        };
        let extractor = extractor_with(MockProvider::default(), config);

        let result = extractor.process_document("memo", &text).await.unwrap();
        let summary = &result.summary;
        assert!(matches!(
            summary.structure_mode,
            StructureMode::SlidingWindow { distinct_sections: 0, required: 3 }
        ));
        assert_eq!(summary.chunks_per_section.get(UNSECTIONED), Some(&summary.chunk_count));
        assert_eq!(summary.requirements_per_section.get(UNSECTIONED), Some(&40));
    }

    // Splitter invariants over generated documents

    fn sentence() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,10}( [a-z]{1,10}){0,8}\\.",
            "[a-z]{1,10} shall [a-z]{1,10}( [a-z]{1,10}){0,4}\\.",
            "[a-z]{1,10} must [a-z]{1,10}!",
            "§[a-z]{0,30}",
            "[a-z]{40,90}",
        ]
    }

    fn paragraph() -> impl Strategy<Value = String> {
        prop::collection::vec(sentence(), 1..6).prop_map(|s| s.join(" "))
    }

    fn section_body() -> impl Strategy<Value = String> {
        prop::collection::vec(paragraph(), 0..4).prop_map(|p| p.join("\n\n"))
    }

    fn document() -> impl Strategy<Value = String> {
        (
            "[a-z ]{0,40}",
            prop::collection::vec((0usize..13, section_body()), 0..6),
        )
            .prop_map(|(preamble, sections)| {
                let mut text = preamble;
                text.push('\n');
                for (idx, body) in sections {
                    let letter = (b'A' + idx as u8) as char;
                    text.push_str(&format!("SECTION {} - PART\n{}\n", letter, body));
                }
                text
            })
    }

    fn split_with(
        config: &ExtractorConfig,
        text: &str,
    ) -> (crate::SplitReport, bool) {
        let dialect = DocumentDialect::uniform_contract_format();
        let scan = DocumentStructureScanner::new(dialect.clone(), config.min_section_pattern_matches)
            .scan(text);
        let structured = scan.is_structured();
        let report = ChunkSplitter::new(config, dialect)
            .unwrap()
            .split("doc", text, &scan);
        (report, structured)
    }

    fn config_for(max_chunk_chars: usize, max_requirements: usize, density_overlap: usize) -> ExtractorConfig {
        ExtractorConfig {
            max_chunk_chars,
            max_requirements_per_chunk: max_requirements,
            sliding_window_overlap_chars: max_chunk_chars / 4,
            density_split_overlap_chars: density_overlap.min(max_chunk_chars - 1),
            ..ExtractorConfig::default()
        }
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_source(
            text in document(),
            max in 40usize..300,
            reqs in 1usize..5,
        ) {
            let (report, _) = split_with(&config_for(max, reqs, 0), &text);
            prop_assert_eq!(reconstruct_source(&report.chunks), text);
            prop_assert_eq!(report.truncated_bytes, 0);
        }

        #[test]
        fn prop_chunks_respect_length_bound(
            text in document(),
            max in 40usize..300,
            reqs in 1usize..5,
            overlap in 0usize..60,
        ) {
            let (report, _) = split_with(&config_for(max, reqs, overlap), &text);
            for chunk in &report.chunks {
                prop_assert!(chunk.char_len() <= max, "chunk {} has {} chars", chunk.id, chunk.char_len());
            }
        }

        #[test]
        fn prop_structured_chunks_respect_density_bound(
            text in document(),
            max in 40usize..300,
            reqs in 1usize..5,
        ) {
            let (report, structured) = split_with(&config_for(max, reqs, 0), &text);
            if structured {
                for chunk in &report.chunks {
                    prop_assert!(chunk.requirement_count <= reqs);
                    prop_assert!(chunk.split_kind != SplitKind::SlidingWindow);
                }
            }
        }

        #[test]
        fn prop_chunks_preserve_document_order(
            text in document(),
            max in 40usize..300,
            reqs in 1usize..5,
        ) {
            let (report, _) = split_with(&config_for(max, reqs, 0), &text);
            for (i, chunk) in report.chunks.iter().enumerate() {
                prop_assert_eq!(chunk.ordinal, i);
            }
            for pair in report.chunks.windows(2) {
                prop_assert!(pair[0].source_start < pair[1].source_start);
            }
        }
    }
}
