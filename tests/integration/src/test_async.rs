//! The async driver over the same store.

#[cfg(test)]
mod tests {
    use dynorm_core::{OrmResult, QuerySpec, ScanSpec, Table, field};
    use dynorm_model::{AttributeValue, Consistency, Item, StoreError, WriteRequest};
    use futures::{StreamExt, TryStreamExt};

    use crate::{ScriptedStore, init_tracing, order_records, orders_schema, seqs};

    fn table(n: usize) -> Table<ScriptedStore> {
        init_tracing();
        Table::new(ScriptedStore::new("pk", "sk", order_records(n)), orders_schema())
    }

    #[tokio::test]
    async fn test_should_stream_records_across_pages() {
        let table = table(10);
        let spec = QuerySpec::builder("c1").page_size(4).build(table.schema()).unwrap();
        let records: Vec<Item> = table
            .query_async::<Item>(&spec)
            .unwrap()
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 10);
        assert_eq!(seqs(&records)[9], "009");
        assert_eq!(table.gateway().reads().len(), 3);
    }

    #[tokio::test]
    async fn test_should_stop_stream_at_total_limit() {
        let table = table(10);
        let spec = QuerySpec::builder("c1")
            .limit(6)
            .page_size(4)
            .build(table.schema())
            .unwrap();
        let records: Vec<OrmResult<Item>> = table
            .query_async::<Item>(&spec)
            .unwrap()
            .into_stream()
            .collect()
            .await;
        assert_eq!(records.len(), 6);
        assert_eq!(table.gateway().reads().len(), 2);
    }

    #[tokio::test]
    async fn test_should_resume_async_reads_from_cursor() {
        let table = table(9);
        let spec = QuerySpec::builder("c1")
            .limit(5)
            .page_size(2)
            .build(table.schema())
            .unwrap();
        let mut iter = table.query_async::<Item>(&spec).unwrap();
        let mut head = Vec::new();
        while let Some(record) = iter.try_next().await.unwrap() {
            head.push(record);
        }
        let cursor = iter.last_evaluated_key().cloned().unwrap();

        let tail = table
            .query_async::<Item>(&spec.resume_from(cursor))
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(seqs(&head), ["000", "001", "002", "003", "004"]);
        assert_eq!(seqs(&tail), ["005", "006", "007", "008"]);
    }

    #[tokio::test]
    async fn test_should_resume_async_read_mid_page() {
        let table = table(10);
        let spec = QuerySpec::builder("c1").page_size(5).build(table.schema()).unwrap();
        let mut iter = table.query_async::<Item>(&spec).unwrap();
        let mut head = Vec::new();
        for _ in 0..3 {
            head.push(iter.try_next().await.unwrap().unwrap());
        }
        let cursor = iter.last_evaluated_key().cloned().unwrap();

        let tail = table
            .query_async::<Item>(&spec.resume_from(cursor))
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let mut all = seqs(&head);
        all.extend(seqs(&tail));
        assert_eq!(all, (0..10).map(|i| format!("{i:03}")).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_should_scan_segments_concurrently_in_order() {
        let table = table(8);
        let spec = ScanSpec::builder().page_size(1).build(table.schema()).unwrap();
        let segments: Vec<Vec<Item>> = table.parallel_scan(&spec, 4).await.unwrap();

        assert_eq!(segments.len(), 4);
        for (segment, records) in segments.iter().enumerate() {
            let expected = [format!("{segment:03}"), format!("{:03}", segment + 4)];
            assert_eq!(seqs(records), expected);
        }
    }

    #[tokio::test]
    async fn test_should_count_scan_asynchronously() {
        let table = table(7);
        let spec = ScanSpec::builder()
            .filter(field("total").gt(0_i64))
            .page_size(3)
            .build(table.schema())
            .unwrap();
        assert_eq!(table.count_scan_async(&spec).await.unwrap(), 7);
        assert_eq!(table.gateway().reads().len(), 3);
    }

    #[tokio::test]
    async fn test_should_get_record_asynchronously() {
        let table = table(4);
        let key: Item = [
            ("customer".to_owned(), AttributeValue::from("c1")),
            ("seq".to_owned(), AttributeValue::from("002")),
        ]
        .into_iter()
        .collect();
        let record: Item = table
            .get_async(&key, Some(Consistency::Strong), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.get("total"), Some(&AttributeValue::from(20_i64)));
        assert!(table.gateway().gets()[0].consistent_read);
    }

    #[tokio::test]
    async fn test_should_surface_async_write_errors() {
        let table = table(0);
        table
            .gateway()
            .fail_next_write(StoreError::throttled("slow down"));
        let key: Item = [
            ("customer".to_owned(), AttributeValue::from("c1")),
            ("seq".to_owned(), AttributeValue::from("000")),
        ]
        .into_iter()
        .collect();

        let err = table.delete_async(&key, None).await.unwrap_err();
        assert!(err.to_string().contains("slow down"));

        table.delete_async(&key, None).await.unwrap();
        table.put_record_async(&key, None).await.unwrap();
        let writes = table.gateway().writes();
        assert!(matches!(&writes[0], WriteRequest::Delete(input) if input.key.len() == 2));
        assert!(matches!(&writes[1], WriteRequest::Put(input) if input.item.get("sk") == key.get("seq")));
    }
}
