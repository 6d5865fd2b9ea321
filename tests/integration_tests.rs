use financial_statement_tree::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const INCOME_EXPORT: &str = "\u{feff}2025 손익계산서 (단위: 백만원),,,,,,,,,,
구분,Sep-25A,Oct-25A,Nov-25F,24-Nov,Nov YoY,Dec-25F,Dec YoY,Jan-26F,합계,비고
1. 매출액,\"1,000\",\"1,100\",\"1,200\",\"1,000\",120.0%,\"1,300\",,\"1,400\",\"14,000\",
온라인,600,650,700,550,127.3%,750,,800,\"8,000\",
오프라인,400,450,500,450,111.1%,550,,600,\"6,000\",
,,,,,,,,,,
2. 매출원가,(600),(650),(700),(640),109.4%,(750),,(800),\"(8,200)\",
(1) 상품원가,500,540,580,530,109.4%,620,,660,\"6,800\",\"단가 인상, 환율\"
국내,300,320,340,310,109.7%,360,,380,\"4,000\",
(2) 물류비,100,110,120,110,109.1%,130,,140,\"1,400\",
매출총이익,400,450,500,360,138.9%,550,,600,\"5,800\",
3. 판매관리비,250,260,270,240,112.5%,280,,290,\"3,100\",
영업이익,150,190,230,120,191.7%,270,,310,\"2,700\",
영업외수익,5,5,5,5,100.0%,5,,5,60,
당기순이익,140,180,220,110,200.0%,260,,300,\"2,500\",
";

fn income_config() -> StatementConfig {
    StatementConfig::income_statement()
        .with_period_comparisons(2025, &[11, 12])
        .with_obsolete_columns(&["Jan-26F"])
}

fn income_statement() -> FinancialStatement {
    init_logger();
    StatementParser::new(income_config())
        .expect("income config is valid")
        .parse(INCOME_EXPORT)
}

fn labels(view: &StatementView) -> Vec<&str> {
    view.rows.iter().map(|r| r.label.as_str()).collect()
}

#[test]
fn test_income_statement_columns() {
    let statement = income_statement();

    let names: Vec<&str> = statement
        .columns
        .iter()
        .map(|c| c.canonical_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Sep-25A", "Oct-25A", "24-Nov", "Nov-25F", "Nov YoY", "24-Dec", "Dec-25F", "Dec YoY",
            "Total", "Total YoY", "비고"
        ]
    );

    let prior_dec = &statement.columns[5];
    assert!(prior_dec.is_synthesized());
    assert!(statement.rows.iter().all(|r| r.raw_values[5].is_empty()));

    let total = &statement.columns[8];
    assert_eq!(total.source_name, "합계");
    assert_eq!(total.role, ColumnRole::Total);

    assert_eq!(statement.columns[10].kind, ColumnKind::Text);
    assert_eq!(statement.columns[4].kind, ColumnKind::YoyRatio);
    assert_eq!(statement.columns[3].display_name, "Nov-25");
    assert_eq!(statement.window_start, Some(1));
}

#[test]
fn test_income_statement_rows() {
    let statement = income_statement();

    let row_labels: Vec<&str> = statement.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        row_labels,
        vec![
            "매출액", "온라인", "오프라인", "매출원가", "상품원가", "국내", "물류비", "매출총이익",
            "판매관리비", "영업이익"
        ]
    );

    let revenue = statement.find_row("매출액").unwrap();
    assert_eq!(
        revenue.raw_values,
        vec!["1,000", "1,100", "1,000", "1,200", "120.0%", "", "1,300", "", "14,000", "", ""]
    );

    let goods = statement.find_row("상품원가").unwrap();
    assert_eq!(goods.value(10), "단가 인상, 환율");
    assert_eq!(goods.polarity, RowPolarity::Expense);

    let domestic = statement.find_row("국내").unwrap();
    assert_eq!(domestic.parent_key, goods.category_key);
    assert_eq!(domestic.indent_level, 2);

    let operating = statement.find_row("영업이익").unwrap();
    assert_eq!(operating.kind, RowKind::Aggregate);
    assert!(operating.category_key.is_none());
}

#[test]
fn test_parent_keys_point_backwards() {
    let statement = income_statement();
    for (i, row) in statement.rows.iter().enumerate() {
        if matches!(row.kind, RowKind::SubCategory | RowKind::LeafItem) {
            let parent = row.parent_key.as_ref().expect("child rows carry a parent");
            assert!(
                statement.rows[..i]
                    .iter()
                    .any(|earlier| earlier.category_key.as_ref() == Some(parent)),
                "row '{}' points at a key not seen before it",
                row.label
            );
        }
    }
}

#[test]
fn test_reparse_is_value_equal() {
    let parser = StatementParser::new(income_config()).unwrap();
    assert_eq!(parser.parse(INCOME_EXPORT), parser.parse(INCOME_EXPORT));
}

#[test]
fn test_collapsed_recent_view() {
    let statement = income_statement();
    let view = assemble_view(&statement, &ExpansionState::default(), ViewOptions::default());

    assert_eq!(
        labels(&view),
        vec!["매출액", "매출원가", "매출총이익", "판매관리비", "영업이익"]
    );
    assert_eq!(
        view.header_labels(),
        vec![
            "구분", "Oct-25A", "24-Nov", "Nov-25", "Nov YoY", "24-Dec", "Dec-25", "Dec YoY",
            "Total", "Total YoY", "비고"
        ]
    );
    assert_eq!(
        view.column_sets,
        vec![
            ColumnSetSpan {
                id: "2025-11".to_string(),
                start: 1,
                end: 3
            },
            ColumnSetSpan {
                id: "2025-12".to_string(),
                start: 4,
                end: 6
            },
        ]
    );

    let revenue = &view.rows[0];
    assert_eq!(revenue.cells[0].display, "1,100");
    assert_eq!(revenue.cells[3].display, "120%");
    assert_eq!(revenue.cells[3].tone, Some(Tone::Favorable));
    assert_eq!(revenue.cells[4].display, "-");

    let cost = &view.rows[1];
    assert_eq!(cost.cells[0].display, "(650)");
    assert_eq!(cost.cells[0].sign, Sign::Negative);
    assert_eq!(cost.cells[3].tone, Some(Tone::Unfavorable));
    assert_eq!(cost.cells[7].display, "(8,200)");
}

#[test]
fn test_expanding_categories_step_by_step() {
    let statement = income_statement();
    let cost = CategoryKey::main("income-statement", "매출원가");

    let state = ExpansionState::default().toggle(cost.clone());
    let view = assemble_view(&statement, &state, ViewOptions::default());
    assert_eq!(
        labels(&view),
        vec!["매출액", "매출원가", "상품원가", "물류비", "매출총이익", "판매관리비", "영업이익"]
    );

    let state = state.toggle(cost.child("상품원가"));
    let view = assemble_view(&statement, &state, ViewOptions::default());
    assert!(labels(&view).contains(&"국내"));

    let state = state.toggle(cost.clone());
    let view = assemble_view(&statement, &state, ViewOptions::default());
    assert!(!labels(&view).contains(&"상품원가"));
    assert!(!labels(&view).contains(&"국내"));
}

#[test]
fn test_expansion_closure() {
    let statement = income_statement();
    let all_keys: Vec<CategoryKey> = statement.category_keys().cloned().collect();

    // Every subset of the category keys.
    for mask in 0..(1u32 << all_keys.len()) {
        let state = all_keys
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .fold(ExpansionState::default(), |state, (_, key)| {
                state.expand(key.clone())
            });
        let view = assemble_view(&statement, &state, ViewOptions::default());

        for row in &view.rows {
            if row.kind == RowKind::Aggregate {
                continue;
            }
            if let Some(parent) = &row.parent_key {
                let closed_ancestor = all_keys
                    .iter()
                    .filter(|key| !state.contains(key))
                    .any(|key| key == parent || key.is_ancestor_of(parent));
                assert!(!closed_ancestor, "'{}' visible under a closed category", row.label);
            }
        }
    }
}

#[test]
fn test_banner_header_single_row_scenario() {
    init_logger();
    let statement = parse_statement(
        "Revenue summary\n구분,Jan,Total\n1. Revenue,100,1200",
        &StatementConfig::default(),
    )
    .unwrap();

    let names: Vec<&str> = statement
        .columns
        .iter()
        .map(|c| c.canonical_name.as_str())
        .collect();
    assert_eq!(names, vec!["Jan", "Total", "Total YoY"]);

    let view = assemble_view(
        &statement,
        &ExpansionState::default(),
        ViewOptions {
            show_all_periods: true,
        },
    );
    assert_eq!(view.rows.len(), 1);
    let cells: Vec<&str> = view.rows[0]
        .cells
        .iter()
        .map(|c| c.display.as_str())
        .collect();
    assert_eq!(cells, vec!["100", "1,200", "-"]);
}

#[test]
fn test_sub_category_hidden_until_main_expanded() {
    let statement = parse_statement(
        "banner\n구분,Jan,Total\n1. Revenue,100,1200\n(1) Online,60,700",
        &StatementConfig::default(),
    )
    .unwrap();
    let options = ViewOptions {
        show_all_periods: true,
    };

    let collapsed = ExpansionState::default();
    assert_eq!(assemble_view(&statement, &collapsed, options).rows.len(), 1);

    let expanded = collapsed.toggle(CategoryKey::main("statement", "Revenue"));
    let view = assemble_view(&statement, &expanded, options);
    assert_eq!(labels(&view), vec!["Revenue", "Online"]);
}

#[test]
fn test_operating_expense_ledger() {
    init_logger();
    let text = "판매관리비 상세,,,
구분,Jan-25A,Feb-25A,Feb YoY
1. 인건비,100,110,105.0%
급여,80,88,104.0%
2. 광고선전비,50,40,80.0%
팝업_SEM광고비_네이버,5,5,100.0%
팝업_SEM광고비_구글,3,3,100.0%
판매관리비 합계,150,150,112.0%
";
    let config = StatementConfig::operating_expense();
    let statement = parse_statement(text, &config).unwrap();

    assert!(statement.find_row("팝업_SEM광고비_네이버").is_none());
    assert_eq!(statement.rows.len(), 4);
    assert!(statement
        .rows
        .iter()
        .all(|r| r.polarity == RowPolarity::Expense));

    let view = assemble_view(
        &statement,
        &ExpansionState::default().expand_all(&statement),
        ViewOptions {
            show_all_periods: true,
        },
    );
    let yoy = view
        .columns
        .iter()
        .position(|c| c.canonical_name == "Feb YoY")
        .unwrap();
    // Expenses growing is bad, shrinking is good.
    assert_eq!(view.rows[0].cells[yoy].tone, Some(Tone::Unfavorable));
    assert_eq!(view.rows[2].cells[yoy].tone, Some(Tone::Favorable));

    let total = &view.rows[3];
    assert_eq!(total.kind, RowKind::Aggregate);
    assert_eq!(total.cells[yoy].display, "112%");
    assert_eq!(total.cells[yoy].tone, Some(Tone::Unfavorable));
}

#[test]
fn test_cash_flow_workbook() -> anyhow::Result<()> {
    init_logger();
    let text = "\u{feff}3. CASH FLOW,,,
구분,Jan-25A,Feb-25F,Total
1. 기초현금,\"$1,000\",\"$1,050\",\"$1,000\"
영업활동현금흐름,50,(20),30
기말현금,\"1,050\",\"1,030\",\"1,030\"
,,,
3-2. LOAN STATUS,,,
구분,차입처,잔액,금리
본사 차입금,KB국민,500,4.5%
3-3. FACTORS,,,
구분,Jan-25A,Feb-25F
환율,\"1,350\",\"1,360\"
";

    let sections = workbook::parse_sections(text, &workbook::cash_flow_sections())?;
    assert_eq!(sections.len(), 3);

    let cash = &sections[0].statement;
    let view = assemble_view(cash, &ExpansionState::default(), ViewOptions::default());
    assert_eq!(labels(&view), vec!["기초현금", "영업활동현금흐름", "기말현금"]);
    assert_eq!(view.rows[0].cells[0].display, "1,000");
    assert_eq!(view.rows[1].cells[1].display, "(20)");

    let loan = &sections[1].statement;
    assert_eq!(loan.find_row("본사 차입금").unwrap().value(0), "KB국민");
    Ok(())
}

#[test]
fn test_config_from_json() -> anyhow::Result<()> {
    let json = r#"{
        "table_id": "pl-2025",
        "total_label": "연간합계",
        "total_synonyms": ["합계", "Total"],
        "total_delta_label": null,
        "row_rules": [
            { "pattern": "^[IVX]+\\.\\s*", "kind": "MainCategory" },
            { "pattern": "^-\\s*", "kind": "SubCategory" }
        ],
        "expense_categories": ["비용"]
    }"#;
    let config = StatementConfig::from_json(json)?;
    let statement = parse_statement(
        "b\n구분,Jan,합계\nI. 수익,10,10\n- 상품,10,10\nII. 비용,5,5",
        &config,
    )?;

    let names: Vec<&str> = statement
        .columns
        .iter()
        .map(|c| c.canonical_name.as_str())
        .collect();
    assert_eq!(names, vec!["Jan", "연간합계"]);
    assert_eq!(statement.rows[1].kind, RowKind::SubCategory);
    assert_eq!(statement.rows[1].label, "상품");
    assert_eq!(statement.rows[2].polarity, RowPolarity::Expense);

    assert!(StatementConfig::schema_as_json()?.contains("row_rules"));
    Ok(())
}

#[test]
fn test_rollup_of_balance_sheet_rows() {
    let statement = parse_statement(
        "BS,,,\n구분,Jan-25A,Feb-25A,Total\n1. 비유동자산,,,\n유형자산,\"1,200\",\"1,300\",\n보증금,300,350,\n",
        &StatementConfig::balance_sheet(),
    )
    .unwrap();

    let fixed = sum_rows(&statement, &["유형자산", "보증금"]).unwrap();
    assert_eq!(fixed, vec!["1,500", "1,650", ""]);
}

#[test]
fn test_tokenizer_agrees_with_csv_reader() {
    let lines = [
        "1. 매출액,\"1,000\",\"(3,400)\",45%",
        "구분, Jan-25A , Total",
        "\"say \"\"hi\"\"\",x,",
        "단가 인상,\"A, B, C\",\"\"",
    ];

    for line in lines {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());
        let record = reader
            .records()
            .next()
            .expect("one record")
            .expect("well-formed line");
        let expected: Vec<String> = record.iter().map(str::to_string).collect();
        assert_eq!(split_line(line), expected, "line: {}", line);
    }
}

#[test]
fn test_section_locator_on_statement_blob() {
    let blob = "3. CASH FLOW,,\n구분,Jan\n\n3-2. LOAN STATUS,,\n구분,잔액";
    let spans = locate_sections(blob, &["3. CASH FLOW", "3-2. LOAN STATUS", "3-3. FACTORS"]);
    assert_eq!(spans[0], Some(SectionSpan { start: 0, end: 3 }));
    assert_eq!(spans[1], Some(SectionSpan { start: 3, end: 5 }));
    assert_eq!(spans[2], None);
}
