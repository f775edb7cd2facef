use std::net::TcpStream;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use rtsp::{AuthProvider, Connection, Method, Request, Response};
use url::Url;

#[derive(Parser)]
#[command(
    name = "rtsp-probe",
    about = "Send OPTIONS and DESCRIBE to an RTSP server and print the replies"
)]
struct Args {
    /// Stream URL (rtsp://[user[:password]@]host[:port]/path)
    url: Url,

    /// Username, used if the server asks for authentication. Defaults to
    /// the one in the URL
    #[arg(long, short)]
    user: Option<String>,

    /// Password, used if the server asks for authentication. Defaults to
    /// the one in the URL
    #[arg(long, short)]
    password: Option<String>,

    /// Socket read/write timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match probe(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("probe failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn probe(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let target = Target::from_url(&args.url)?;
    let user = args.user.clone().or(target.user);
    let password = args.password.clone().or(target.password).unwrap_or_default();
    let uri = target.request_uri.as_str();

    let stream = TcpStream::connect(&target.addr)?;
    let timeout = Some(Duration::from_secs(args.timeout_secs)).filter(|d| !d.is_zero());
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)?;
    tracing::info!(addr = %target.addr, "connected");

    let mut conn = Connection::new(stream)?;
    conn.enable_sequencing();

    let options = exchange(&mut conn, Request::new(Method::Options, uri))?;
    print_response(&options);

    let describe = || Request::new(Method::Describe, uri).with_header("Accept", "application/sdp");
    let mut response = exchange(&mut conn, describe())?;

    if response.status_code == 401 {
        let Some(user) = &user else {
            print_response(&response);
            return Err("server requires credentials; pass --user and --password".into());
        };
        let provider = AuthProvider::from_challenges(user, &password, response.www_authenticate())?;
        tracing::debug!("answering authentication challenge");
        conn.set_auth_provider(provider);
        response = exchange(&mut conn, describe())?;
    }

    print_response(&response);
    if !response.is_success() {
        return Err(format!("DESCRIBE failed: {} {}", response.status_code, response.reason).into());
    }
    Ok(())
}

fn exchange(
    conn: &mut Connection<TcpStream, TcpStream>,
    mut request: Request,
) -> rtsp::Result<Response> {
    conn.write_request(&mut request)?;
    println!(">> {} {}", request.method, request.uri);
    conn.read_response()
}

fn print_response(response: &Response) {
    println!(
        "<< {} {} {}",
        response.version, response.status_code, response.reason
    );
    for (name, values) in response.headers.iter() {
        for value in values {
            println!("   {}: {}", name, value);
        }
    }
    if !response.body.is_empty() {
        println!();
        println!("{}", String::from_utf8_lossy(&response.body));
    }
}

/// Where to connect and what to put on the request line, split out of
/// the stream URL.
#[derive(Debug, PartialEq)]
struct Target {
    /// `host:port`, port 554 unless the URL names one.
    addr: String,
    /// The URL without its userinfo.
    request_uri: Url,
    user: Option<String>,
    password: Option<String>,
}

impl Target {
    fn from_url(url: &Url) -> Result<Self, String> {
        if url.scheme() != "rtsp" {
            return Err(format!("unsupported URL {}; only rtsp:// is supported", url));
        }
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| format!("missing host in URL {}", url))?;
        let addr = format!("{}:{}", host, url.port().unwrap_or(554));

        let user = Some(url.username())
            .filter(|user| !user.is_empty())
            .map(str::to_string);
        let password = url.password().map(str::to_string);

        let mut request_uri = url.clone();
        request_uri
            .set_username("")
            .and_then(|()| request_uri.set_password(None))
            .map_err(|()| format!("cannot strip credentials from URL {}", url))?;

        Ok(Target {
            addr,
            request_uri,
            user,
            password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> Result<Target, String> {
        Url::parse(url)
            .map_err(|e| e.to_string())
            .and_then(|url| Target::from_url(&url))
    }

    #[test]
    fn default_and_explicit_ports() {
        assert_eq!(target("rtsp://cam.local/live").unwrap().addr, "cam.local:554");
        assert_eq!(target("rtsp://10.0.0.2:8554/s/1").unwrap().addr, "10.0.0.2:8554");
        assert_eq!(target("rtsp://[::1]/s").unwrap().addr, "[::1]:554");
        assert_eq!(target("rtsp://[::1]:8554/s").unwrap().addr, "[::1]:8554");
    }

    #[test]
    fn credentials_are_taken_out_of_the_request_uri() {
        let full = target("rtsp://admin:pw@cam/live").unwrap();
        assert_eq!(full.addr, "cam:554");
        assert_eq!(full.request_uri.as_str(), "rtsp://cam/live");
        assert_eq!(full.user.as_deref(), Some("admin"));
        assert_eq!(full.password.as_deref(), Some("pw"));

        let user_only = target("rtsp://admin@10.0.0.2/").unwrap();
        assert_eq!(user_only.request_uri.as_str(), "rtsp://10.0.0.2/");
        assert_eq!(user_only.user.as_deref(), Some("admin"));
        assert_eq!(user_only.password, None);
    }

    #[test]
    fn query_stays_on_the_request_uri() {
        let query = target("rtsp://cam?token=1").unwrap();
        assert_eq!(query.addr, "cam:554");
        assert_eq!(query.request_uri.as_str(), "rtsp://cam?token=1");
        assert_eq!(query.user, None);
    }

    #[test]
    fn rejects_other_schemes_and_missing_host() {
        assert!(target("http://cam.local/").is_err());
        assert!(target("rtsp:///path").is_err());
    }
}
