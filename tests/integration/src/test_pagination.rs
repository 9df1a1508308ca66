//! Pagination scenarios through the blocking driver.

#[cfg(test)]
mod tests {
    use dynorm_core::query::ReadRequest;
    use dynorm_core::{OrmError, OrmResult, QuerySpec, ScanSpec, Table, field};
    use dynorm_model::{AttributeValue, Consistency, Item, PageCursor};

    use crate::{ScriptedStore, init_tracing, order_records, orders_schema, seqs};

    fn table(n: usize) -> Table<ScriptedStore> {
        init_tracing();
        Table::new(ScriptedStore::new("pk", "sk", order_records(n)), orders_schema())
    }

    fn limits(store: &ScriptedStore) -> Vec<Option<u32>> {
        store.reads().iter().map(ReadRequest::limit).collect()
    }

    fn start_keys(store: &ScriptedStore) -> Vec<Option<PageCursor>> {
        store
            .reads()
            .iter()
            .map(|r| r.exclusive_start_key().cloned())
            .collect()
    }

    fn expected(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{i:03}")).collect()
    }

    #[test]
    fn test_should_yield_total_limit_in_three_round_trips() {
        let table = table(25);
        let spec = QuerySpec::builder("c1")
            .limit(12)
            .page_size(5)
            .build(table.schema())
            .unwrap();

        let records: Vec<Item> = table
            .query::<Item>(&spec)
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();

        assert_eq!(seqs(&records), expected(0..12));
        assert_eq!(limits(table.gateway()), [Some(5), Some(5), Some(5)]);
    }

    #[test]
    fn test_should_resume_from_persisted_cursor_without_gaps_or_duplicates() {
        let table = table(25);
        let spec = QuerySpec::builder("c1")
            .limit(12)
            .page_size(5)
            .build(table.schema())
            .unwrap();

        let mut first = table.query::<Item>(&spec).unwrap();
        let mut head: Vec<Item> = Vec::new();
        for record in first.by_ref() {
            head.push(record.unwrap());
        }
        let cursor = first.last_evaluated_key().cloned().unwrap();
        assert_eq!(
            cursor.as_item().get("sk"),
            Some(&AttributeValue::from("011"))
        );

        let persisted = serde_json::to_string(&cursor).unwrap();
        let restored: PageCursor = serde_json::from_str(&persisted).unwrap();
        let rest_spec = QuerySpec::builder("c1")
            .page_size(5)
            .build(table.schema())
            .unwrap()
            .resume_from(restored);
        let tail: Vec<Item> = table
            .query::<Item>(&rest_spec)
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();

        let mut all = seqs(&head);
        all.extend(seqs(&tail));
        assert_eq!(all, expected(0..25));
    }

    #[test]
    fn test_should_resume_mid_page_without_skipping_buffered_records() {
        let table = table(10);
        let spec = QuerySpec::builder("c1").page_size(5).build(table.schema()).unwrap();

        let mut first = table.query::<Item>(&spec).unwrap();
        let head: Vec<Item> = first.by_ref().take(3).collect::<OrmResult<_>>().unwrap();
        let cursor = first.last_evaluated_key().cloned().unwrap();
        drop(first);

        let tail: Vec<Item> = table
            .query::<Item>(&spec.resume_from(cursor))
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();

        let mut all = seqs(&head);
        all.extend(seqs(&tail));
        assert_eq!(all, expected(0..10));
    }

    #[test]
    fn test_should_request_total_limit_per_round_trip_without_page_size() {
        let table = table(10);
        let spec = QuerySpec::builder("c1").limit(4).build(table.schema()).unwrap();
        let records: Vec<Item> = table
            .query::<Item>(&spec)
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(limits(table.gateway()), [Some(4)]);
    }

    #[test]
    fn test_should_truncate_when_limit_is_below_page_size() {
        let table = table(10);
        let spec = QuerySpec::builder("c1")
            .limit(3)
            .page_size(8)
            .build(table.schema())
            .unwrap();
        let mut iter = table.query::<Item>(&spec).unwrap();
        let page = iter.next_page().unwrap().unwrap();
        assert_eq!(seqs(&page), expected(0..3));
        assert!(iter.next_page().unwrap().is_none());
        assert_eq!(limits(table.gateway()), [Some(8)]);
    }

    #[test]
    fn test_should_drain_until_store_is_exhausted() {
        let table = table(7);
        let spec = QuerySpec::builder("c1").page_size(3).build(table.schema()).unwrap();
        let mut iter = table.query::<Item>(&spec).unwrap();

        let mut cursors = Vec::new();
        while let Some(page) = iter.next_page().unwrap() {
            assert!(!page.is_empty());
            cursors.push(iter.last_evaluated_key().cloned());
        }
        assert_eq!(cursors.len(), 3);
        assert!(cursors[2].is_none());

        // Cursors go back to the store exactly as it returned them.
        let sent = start_keys(table.gateway());
        assert_eq!(sent, [None, cursors[0].clone(), cursors[1].clone()]);
    }

    #[test]
    fn test_should_read_descending_when_requested() {
        let table = table(6);
        let spec = QuerySpec::builder("c1")
            .ascending(false)
            .page_size(4)
            .build(table.schema())
            .unwrap();
        let records: Vec<Item> = table
            .query::<Item>(&spec)
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();
        assert_eq!(seqs(&records), ["005", "004", "003", "002", "001", "000"]);
    }

    #[test]
    fn test_should_issue_no_round_trip_for_zero_limit() {
        let table = table(3);
        let spec = QuerySpec::builder("c1").limit(0).build(table.schema()).unwrap();
        assert_eq!(table.query::<Item>(&spec).unwrap().count(), 0);
        assert!(table.gateway().reads().is_empty());
    }

    #[test]
    fn test_should_reject_strong_read_on_global_index_before_any_round_trip() {
        let table = table(3);
        let err = QuerySpec::builder("open")
            .index("by_status")
            .consistency(Consistency::Strong)
            .build(table.schema())
            .unwrap_err();
        assert!(matches!(err, OrmError::IncompatibleConsistency { .. }));
        assert!(table.gateway().reads().is_empty());
    }

    #[test]
    fn test_should_attach_consistency_to_every_round_trip() {
        let table = table(5);
        let spec = QuerySpec::builder("c1")
            .index("by_total")
            .consistent_read(true)
            .page_size(2)
            .build(table.schema())
            .unwrap();
        let _: Vec<Item> = table
            .query::<Item>(&spec)
            .unwrap()
            .collect::<OrmResult<_>>()
            .unwrap();
        let reads = table.gateway().reads();
        assert_eq!(reads.len(), 3);
        for read in reads {
            let ReadRequest::Query(input) = read else {
                panic!("expected a query");
            };
            assert!(input.consistent_read);
            assert_eq!(input.index_name.as_deref(), Some("by_total"));
        }
    }

    #[test]
    fn test_should_count_without_decoding() {
        let table = table(11);
        let spec = QuerySpec::builder("c1")
            .filter(field("status").eq("open"))
            .page_size(4)
            .build(table.schema())
            .unwrap();
        assert_eq!(table.count_query(&spec).unwrap(), 11);
        assert_eq!(table.gateway().reads().len(), 3);
    }

    #[test]
    fn test_should_scan_segments_independently() {
        let table = table(9);
        let spec = ScanSpec::builder().page_size(2).build(table.schema()).unwrap();
        let mut seen = Vec::new();
        for segment in spec.segments(3).unwrap() {
            let records: Vec<Item> = table
                .scan::<Item>(&segment)
                .unwrap()
                .collect::<OrmResult<_>>()
                .unwrap();
            assert_eq!(records.len(), 3);
            seen.extend(seqs(&records));
        }
        seen.sort();
        assert_eq!(seen, expected(0..9));
    }
}
