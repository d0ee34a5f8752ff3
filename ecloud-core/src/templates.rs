//! Fixed templates installed into the search services.

/// Minimal Solr schema: an `id` key, a term-vectored `raw_text` field and a catch-all dynamic field.
pub const SOLR_SCHEMA: &str = r#"<schema name="minimal" version="1.5">

    <field name="id" type="string" indexed="true" stored="true" required="true" />
    <field name="raw_text" type="text_general" indexed="true" stored="true" termVectors="true" required="false" />

    <dynamicField name="*" type="text_general" indexed="true" stored="true" termVectors="true" multiValued="true" />
    <uniqueKey>id</uniqueKey>

    <fieldType name="string" class="solr.StrField"/>

    <fieldType name="text_general" class="solr.TextField" positionIncrementGap="100">
      <analyzer type="index">
        <tokenizer class="solr.StandardTokenizerFactory"/>
      </analyzer>
      <analyzer type="query">
        <tokenizer class="solr.StandardTokenizerFactory"/>
      </analyzer>
    </fieldType>

</schema>
"#;

pub const SOLR_CONFIG: &str = r#"<config>

  <dataDir>${solr.data.dir:}</dataDir>

  <directoryFactory name="DirectoryFactory"
                    class="${solr.directoryFactory:solr.NRTCachingDirectoryFactory}"/>

  <luceneMatchVersion>${tests.luceneMatchVersion:LATEST}</luceneMatchVersion>

  <updateHandler class="solr.DirectUpdateHandler2">
    <commitWithin>
      <softCommit>${solr.commitwithin.softcommit:true}</softCommit>
    </commitWithin>

  </updateHandler>
  <requestHandler name="/select" class="solr.SearchHandler">
    <lst name="defaults">
      <str name="echoParams">explicit</str>
      <str name="indent">true</str>
      <str name="df">text</str>
    </lst>

  </requestHandler>

  <requestHandler name="/admin/" class="org.apache.solr.handler.admin.AdminHandlers" />

  <requestHandler name="/update" class="solr.UpdateRequestHandler"  />
</config>
"#;

pub const SOLR_SCHEMA_FILE: &str = "schema.xml";
pub const SOLR_CONFIG_FILE: &str = "solrconfig.xml";

/// Elasticsearch index body mapping `raw_text` with positional term vectors under `type_name`.
pub fn elasticsearch_mapping(type_name: &str) -> serde_json::Value {
    let mut mappings = serde_json::Map::new();
    mappings.insert(
        type_name.to_string(),
        serde_json::json!({
            "properties": {
                "raw_text": {
                    "type": "string",
                    "term_vector": "with_positions_offsets"
                }
            }
        }),
    );
    serde_json::json!({ "mappings": mappings })
}
