mod extractor_tests;
mod html_parser_tests;
