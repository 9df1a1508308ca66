//! Mixed-type partitions routed by discriminator.

#[cfg(test)]
mod tests {
    use dynorm_core::{Collection, QuerySpec, Table};
    use dynorm_model::{AttributeValue, Item};

    use crate::{ScriptedStore, init_tracing, order_records, orders_schema};

    #[derive(Debug, PartialEq)]
    enum Entry {
        Order { seq: String, total: i64 },
        Refund { seq: String },
    }

    fn seq_of(item: &Item) -> anyhow::Result<String> {
        item.get("seq")
            .and_then(AttributeValue::as_s)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("missing seq"))
    }

    fn collection() -> Collection<Entry> {
        Collection::new(&orders_schema())
            .unwrap()
            .register("order", |item| {
                let total = item
                    .get("total")
                    .and_then(AttributeValue::as_i64)
                    .ok_or_else(|| anyhow::anyhow!("missing total"))?;
                Ok(Entry::Order {
                    seq: seq_of(&item)?,
                    total,
                })
            })
            .register("refund", |item| Ok(Entry::Refund { seq: seq_of(&item)? }))
    }

    /// Four orders, two refunds, one record of an unregistered type and one
    /// without a discriminator.
    fn table() -> Table<ScriptedStore> {
        init_tracing();
        let mut records = order_records(8);
        records[2].insert("_t".to_owned(), AttributeValue::from("refund"));
        records[5].insert("_t".to_owned(), AttributeValue::from("refund"));
        records[6].insert("_t".to_owned(), AttributeValue::from("invoice"));
        records[7].remove("_t");
        Table::new(ScriptedStore::new("pk", "sk", records), orders_schema())
    }

    #[test]
    fn test_should_route_records_by_discriminator() {
        let table = table();
        let spec = QuerySpec::builder("c1").page_size(3).build(table.schema()).unwrap();
        let result = table.query_collection(&collection(), &spec).unwrap();

        assert_eq!(result.len(), 6);
        assert_eq!(
            result.get("refund"),
            [
                Entry::Refund { seq: "002".to_owned() },
                Entry::Refund { seq: "005".to_owned() },
            ]
        );
        let orders: Vec<&str> = result
            .get("order")
            .iter()
            .map(|e| match e {
                Entry::Order { seq, .. } => seq.as_str(),
                Entry::Refund { .. } => "",
            })
            .collect();
        assert_eq!(orders, ["000", "001", "003", "004"]);
        assert_eq!(
            result.get("order")[3],
            Entry::Order { seq: "004".to_owned(), total: 40 }
        );
        assert!(result.get("invoice").is_empty());
        assert_eq!(table.gateway().reads().len(), 3);
    }

    #[tokio::test]
    async fn test_should_route_async_reads_the_same_way() {
        let table = table();
        let spec = QuerySpec::builder("c1").page_size(5).build(table.schema()).unwrap();
        let result = table
            .query_collection_async(&collection(), &spec)
            .await
            .unwrap();
        let buckets = result.into_buckets();
        assert_eq!(buckets.keys().collect::<Vec<_>>(), ["order", "refund"]);
        assert_eq!(buckets["order"].len(), 4);
        assert_eq!(buckets["refund"].len(), 2);
    }

    #[test]
    fn test_should_skip_everything_when_nothing_is_registered() {
        let table = table();
        let spec = QuerySpec::builder("c1").build(table.schema()).unwrap();
        let empty = Collection::<Entry>::new(table.schema()).unwrap();
        let result = table.query_collection(&empty, &spec).unwrap();
        assert!(result.is_empty());
        assert_eq!(empty.discriminator(), "kind");
    }
}
