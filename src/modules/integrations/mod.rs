pub mod oai_pmh;
