mod legacy_flow_tests;
