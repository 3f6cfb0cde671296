use serde::{Deserialize, Serialize};
use serde_envfile::{
    from_reader_into, from_str, from_str_into, from_str_into_with_options, to_string,
    to_string_with_options, to_writer, Decoder, Encoder, EnvOptions, Error,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Limits {
    #[serde(rename = "ca,omitempty")]
    ca: f32,
    #[serde(rename = "cb")]
    cb: u16,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Service {
    #[serde(rename = "a,omitempty")]
    a: String,
    #[serde(rename = "b")]
    b: i64,
    #[serde(rename = "c")]
    c: Limits,
    #[serde(rename = "blabla")]
    d: Vec<Vec<i32>>,
    #[serde(rename = "e")]
    e: HashMap<String, Vec<String>>,
    #[serde(rename = "F")]
    f: String,
    #[serde(rename = "G")]
    g: HashMap<String, i32>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
struct Inner {
    cb: u16,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Outer {
    b: i32,
    c: Inner,
    d: Vec<Vec<i32>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
struct Server {
    host: String,
    port: u16,
    debug: bool,
    ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
struct Retry {
    attempts: Option<u8>,
    label: Option<String>,
}

fn lines(env: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = env.lines().collect();
    lines.sort_unstable();
    lines
}

#[test]
fn test_service_roundtrip() {
    let service = Service {
        a: String::new(),
        b: 123,
        c: Limits { ca: 4.3, cb: 0 },
        d: vec![vec![1, 2, 3]],
        e: HashMap::from([(
            "abc".to_string(),
            vec!["bb".to_string(), "cc".to_string()],
        )]),
        f: "ajfieoaf".to_string(),
        g: HashMap::new(),
    };

    let env = to_string(&service).unwrap();
    println!("Service env:\n{}", env);

    assert_eq!(
        lines(&env),
        [
            "F=ajfieoaf",
            "b=123",
            "blabla_0_0=1",
            "blabla_0_1=2",
            "blabla_0_2=3",
            "c_ca=4.300000190734863",
            "c_cb=0",
            "e_abc_0=bb",
            "e_abc_1=cc",
        ]
    );

    let mut back = Service {
        a: String::new(),
        b: 0,
        c: Limits { ca: 0.0, cb: 0 },
        d: vec![vec![0; 3]],
        e: HashMap::from([("abc".to_string(), vec![String::new(); 2])]),
        f: String::new(),
        g: HashMap::new(),
    };
    from_str_into(&env, &mut back).unwrap();
    assert_eq!(back, service);
}

#[test]
fn test_nested_keys() {
    let outer = Outer {
        b: 123,
        c: Inner { cb: 7 },
        d: vec![vec![1, 2, 3]],
    };

    let env = to_string(&outer).unwrap();
    for expected in ["b=123", "c_cb=7", "d_0_0=1", "d_0_1=2", "d_0_2=3"] {
        assert!(env.lines().any(|line| line == expected), "missing {expected}");
    }

    let mut back = Outer {
        b: 0,
        c: Inner { cb: 0 },
        d: vec![vec![0, 0, 0]],
    };
    from_str_into(&env, &mut back).unwrap();
    assert_eq!(back, outer);
}

#[test]
fn test_shape_is_never_grown() {
    let env = "d_0_0=1\nd_0_1=2\nd_0_2=3\nd_1_0=4\n";
    let mut outer = Outer {
        b: 0,
        c: Inner::default(),
        d: vec![vec![0, 0]],
    };

    from_str_into(env, &mut outer).unwrap();
    assert_eq!(outer.d, vec![vec![1, 2]]);

    let mut ports = BTreeMap::from([("http".to_string(), 0u16)]);
    from_str_into("http=80\nhttps=443\n", &mut ports).unwrap();
    assert_eq!(ports, BTreeMap::from([("http".to_string(), 80)]));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let mut server = Server {
        host: "localhost".to_string(),
        port: 8080,
        debug: false,
        ratio: 0.5,
    };

    from_str_into("HOST=other\nhostname=x\nport_0=1\n", &mut server).unwrap();
    assert_eq!(server.host, "localhost");
    assert_eq!(server.port, 8080);
}

#[test]
fn test_omit_if_zero() {
    let zero = Limits { ca: 0.0, cb: 0 };
    assert_eq!(to_string(&zero).unwrap(), "cb=0\n");

    let set = Limits { ca: -1.5, cb: 0 };
    let env = to_string(&set).unwrap();
    assert_eq!(env.lines().filter(|line| line.starts_with("ca=")).count(), 1);
    assert!(env.contains("ca=-1.5\n"));

    #[derive(Serialize)]
    struct Tags {
        #[serde(rename = "tags,omitempty")]
        tags: Vec<String>,
        #[serde(rename = "retry,omitempty")]
        retry: Option<u8>,
    }

    // the flag does not reach sequence elements
    let env = to_string(&Tags {
        tags: vec![String::new()],
        retry: None,
    })
    .unwrap();
    assert_eq!(env, "tags_0=\n");
}

#[test]
fn test_duplicate_external_names() {
    #[derive(Serialize)]
    struct Twice {
        #[serde(rename = "host")]
        primary: String,
        #[serde(rename = "host,omitempty")]
        secondary: String,
    }

    let twice = Twice {
        primary: "a".to_string(),
        secondary: "b".to_string(),
    };
    assert_eq!(
        to_string(&twice).unwrap_err(),
        Error::DuplicateKey("host".to_string())
    );
}

#[test]
fn test_malformed_lines() {
    let mut server = Server::default();

    let err = from_str_into("host=a\nnoequalsign\n", &mut server).unwrap_err();
    assert_eq!(err, Error::malformed_line(2, "noequalsign"));

    for input in ["=1", "host=a=b", "host=a\n\nport=1"] {
        assert!(
            matches!(from_str_into(input, &mut server), Err(Error::MalformedLine { .. })),
            "{input:?} should be malformed"
        );
    }

    // nothing is written when any line fails
    assert_eq!(server, Server::default());
}

#[test]
fn test_range_and_parse_errors() {
    #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
    struct Widths {
        small: u8,
        count: u32,
        level: i8,
        scale: f32,
    }

    let mut widths = Widths::default();
    assert_eq!(
        from_str_into("small=300", &mut widths).unwrap_err(),
        Error::range("small", "300", "u8")
    );
    assert_eq!(
        from_str_into("count=-1", &mut widths).unwrap_err(),
        Error::parse("count", "-1", "u32")
    );
    assert!(matches!(
        from_str_into("level=-129", &mut widths),
        Err(Error::Range { .. })
    ));
    assert!(matches!(
        from_str_into("scale=1e39", &mut widths),
        Err(Error::Range { .. })
    ));
    assert!(matches!(
        from_str_into("count=ten", &mut widths),
        Err(Error::Parse { .. })
    ));

    from_str_into("small=255\ncount=7\nlevel=-128\nscale=0.25", &mut widths).unwrap();
    assert_eq!(
        widths,
        Widths {
            small: 255,
            count: 7,
            level: -128,
            scale: 0.25,
        }
    );
}

#[test]
fn test_bool_forms() {
    let mut server = Server::default();
    for text in ["1", "t", "T", "true", "TRUE", "True"] {
        from_str_into(&format!("debug={text}"), &mut server).unwrap();
        assert!(server.debug, "{text} should be true");
    }
    for text in ["0", "f", "F", "false", "FALSE", "False"] {
        from_str_into(&format!("debug={text}"), &mut server).unwrap();
        assert!(!server.debug, "{text} should be false");
    }
    assert!(matches!(
        from_str_into("debug=yes", &mut server),
        Err(Error::Parse { .. })
    ));
}

#[test]
fn test_absent_optionals() {
    let retry = Retry::default();
    assert_eq!(to_string(&retry).unwrap(), "attempts=\nlabel=\n");

    let mut retry = Retry::default();
    from_str_into("attempts=5\nlabel=\n", &mut retry).unwrap();
    assert_eq!(
        retry,
        Retry {
            attempts: Some(5),
            label: Some(String::new()),
        }
    );

    let mut retry = Retry::default();
    assert!(matches!(
        from_str_into("attempts=", &mut retry),
        Err(Error::Parse { .. })
    ));
    assert_eq!(retry, Retry::default());
}

#[test]
fn test_present_optional_is_transparent() {
    let retry = Retry {
        attempts: Some(3),
        label: Some("slow".to_string()),
    };
    let env = to_string(&retry).unwrap();
    assert_eq!(env, "attempts=3\nlabel=slow\n");

    let mut back = Retry {
        attempts: Some(0),
        label: Some(String::new()),
    };
    from_str_into(&env, &mut back).unwrap();
    assert_eq!(back, retry);
}

#[test]
fn test_unsupported_types() {
    #[derive(Serialize)]
    enum Mode {
        Fast,
    }

    assert!(matches!(to_string(&Mode::Fast), Err(Error::UnsupportedType(_))));
    assert!(matches!(to_string(&()), Err(Error::UnsupportedType(_))));
    assert!(matches!(to_string(&1u128), Err(Error::UnsupportedType(_))));
    assert!(matches!(
        to_string(&HashMap::from([(1u8, 2u8)])),
        Err(Error::UnsupportedType(_))
    ));

    #[derive(Serialize)]
    struct Nameless {
        #[serde(rename = ",omitempty")]
        value: u8,
    }
    assert!(matches!(
        to_string(&Nameless { value: 1 }),
        Err(Error::UnsupportedType(_))
    ));
}

#[test]
fn test_unit_struct_writes_nothing() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Marker;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct WithMarker {
        a: u8,
        m: Marker,
    }

    let value = WithMarker { a: 1, m: Marker };
    let env = to_string(&value).unwrap();
    assert_eq!(env, "a=1\n");

    let mut back = WithMarker { a: 0, m: Marker };
    from_str_into(&env, &mut back).unwrap();
    assert_eq!(back, value);
}

#[test]
fn test_char_fields() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Letter {
        letter: char,
    }

    assert_eq!(to_string(&Letter { letter: 'q' }).unwrap(), "letter=q\n");

    let mut letter = Letter { letter: 'x' };
    assert_eq!(
        from_str_into("letter=ab\n", &mut letter).unwrap_err(),
        Error::parse("letter", "ab", "char")
    );
    assert_eq!(
        from_str_into("letter=\n", &mut letter).unwrap_err(),
        Error::parse("letter", "", "char")
    );
    assert_eq!(letter, Letter { letter: 'x' });

    from_str_into("letter=z\n", &mut letter).unwrap();
    assert_eq!(letter, Letter { letter: 'z' });
}

#[test]
fn test_prefix_and_uppercase() {
    let server = Server {
        host: "localhost".to_string(),
        port: 8080,
        debug: true,
        ratio: 0.1,
    };
    let options = EnvOptions::new().with_prefix("app").with_uppercase(true);

    let env = to_string_with_options(&server, options.clone()).unwrap();
    assert_eq!(
        env,
        "APP_HOST=localhost\nAPP_PORT=8080\nAPP_DEBUG=true\nAPP_RATIO=0.1\n"
    );

    let mut back = Server::default();
    from_str_into_with_options(&env, &mut back, options).unwrap();
    assert_eq!(back, server);

    // without the options the prefixed keys are unknown
    let mut plain = Server::default();
    from_str_into(&env, &mut plain).unwrap();
    assert_eq!(plain, Server::default());
}

#[test]
fn test_uppercase_collision() {
    let clash = BTreeMap::from([("key", 1u8), ("KEY", 2u8)]);
    assert!(to_string(&clash).is_ok());

    let options = EnvOptions::new().with_uppercase(true);
    assert!(matches!(
        to_string_with_options(&clash, options),
        Err(Error::DuplicateKey(_))
    ));
}

#[test]
fn test_options_from_lookup() {
    let options = EnvOptions::from_lookup(|name| match name {
        "ENCODING_ENV_UPPERCASE" => Some("F".to_string()),
        "ENCODING_ENV_PREFIX" => Some("svc".to_string()),
        _ => None,
    });
    assert!(!options.uppercase);
    assert_eq!(
        to_string_with_options(&Inner { cb: 1 }, options).unwrap(),
        "svc_cb=1\n"
    );
}

#[test]
fn test_encoder_decoder_prefix() {
    let mut encoder = Encoder::new(Vec::new());
    encoder
        .encode_with_prefix("db", &Inner { cb: 9 })
        .unwrap();
    let bytes = encoder.into_inner();
    assert_eq!(bytes, b"db_cb=9\n");

    let mut inner = Inner::default();
    Decoder::new(bytes.as_slice())
        .decode_with_prefix("db", &mut inner)
        .unwrap();
    assert_eq!(inner.cb, 9);
}

#[test]
fn test_writer_and_reader() {
    let server = Server {
        host: "db.internal".to_string(),
        port: 5432,
        debug: false,
        ratio: 2.5,
    };

    let mut buffer = Vec::new();
    to_writer(&mut buffer, &server).unwrap();

    let mut back = Server::default();
    from_reader_into(std::io::Cursor::new(buffer), &mut back).unwrap();
    assert_eq!(back, server);
}

#[test]
fn test_crlf_and_missing_final_newline() {
    let server: Server = from_str("host=a\r\nport=1\r\ndebug=t").unwrap();
    assert_eq!(
        server,
        Server {
            host: "a".to_string(),
            port: 1,
            debug: true,
            ratio: 0.0,
        }
    );
}

#[test]
fn test_last_line_wins() {
    let server: Server = from_str("port=1\nport=2\n").unwrap();
    assert_eq!(server.port, 2);
}
